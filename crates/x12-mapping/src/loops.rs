//! Loop extraction
//!
//! A loop is a repeating block of segments with a fixed, declared shape.
//! Extraction starts at the first segment named like the pattern's opening
//! identifier, keeps every later segment whose name belongs to the pattern,
//! and closes an instance each time exactly `pattern.len()` segments have
//! been collected. Instances are closed by count only; the opening
//! identifier is never re-detected. A repetition that misses one of its
//! segments therefore shifts every following instance, and a trailing
//! partial instance is dropped.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};
use x12_ir::Segment;
use x12_schema::{Error, LoopSpec};

/// One extracted repetition: exactly `pattern.len()` segments in source order
pub type LoopInstance = Vec<Segment>;

/// Group `segments` into instances of `pattern`
///
/// Returns no instances when the opening identifier never occurs or the
/// pattern is empty.
pub fn extract<S: AsRef<str>>(pattern: &[S], segments: &[Segment]) -> Vec<LoopInstance> {
    let Some(opening) = pattern.first().map(AsRef::<str>::as_ref) else {
        return Vec::new();
    };

    let Some(start) = segments.iter().position(|s| s.is(opening)) else {
        debug!(opening, "Loop start segment not found");
        return Vec::new();
    };

    let size = pattern.len();
    let mut instances = Vec::new();
    let mut current: LoopInstance = Vec::with_capacity(size);

    for segment in &segments[start..] {
        if !pattern.iter().any(|identifier| segment.is(identifier.as_ref())) {
            continue;
        }

        trace!(name = %segment.name, collected = current.len(), "Loop segment");
        current.push(segment.clone());

        if current.len() == size {
            instances.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }

    if !current.is_empty() {
        debug!(
            opening,
            dropped = current.len(),
            "Discarded trailing partial loop instance"
        );
    }

    instances
}

/// Infer a loop pattern from the segments that repeat
///
/// Every identifier that occurs more than once forms the pattern, in order of
/// first appearance. Returns `None` when nothing repeats.
pub fn infer_pattern(segments: &[Segment]) -> Option<Vec<String>> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();

    for segment in segments.iter().filter(|s| !s.name.is_empty()) {
        let count = counts.entry(segment.name.as_str()).or_insert(0);
        if *count == 0 {
            order.push(segment.name.as_str());
        }
        *count += 1;
    }

    let pattern: Vec<String> = order
        .into_iter()
        .filter(|name| counts[name] > 1)
        .map(str::to_string)
        .collect();

    if pattern.is_empty() { None } else { Some(pattern) }
}

/// A declared loop together with its extracted instances
#[derive(Debug, Clone, Serialize)]
pub struct LoopEntry {
    #[serde(flatten)]
    spec: LoopSpec,
    contents: Option<Vec<LoopInstance>>,
}

impl LoopEntry {
    /// The loop declaration
    pub fn spec(&self) -> &LoopSpec {
        &self.spec
    }

    /// Extracted instances, `None` until extraction has run
    pub fn contents(&self) -> Option<&[LoopInstance]> {
        self.contents.as_deref()
    }
}

/// Declared loops keyed by position
#[derive(Debug, Clone, Default)]
pub struct LoopSet {
    entries: BTreeMap<usize, LoopEntry>,
}

impl LoopSet {
    /// Create an empty loop set
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a loop; its contents stay empty until [`LoopSet::run`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLoop`] when the position is already taken.
    pub fn declare(&mut self, spec: LoopSpec) -> x12_schema::Result<()> {
        let position = spec.position();
        if self.entries.contains_key(&position) {
            return Err(Error::DuplicateLoop(position));
        }

        self.entries.insert(
            position,
            LoopEntry {
                spec,
                contents: None,
            },
        );
        Ok(())
    }

    /// Extract one loop against `segments`, replacing any previous contents
    ///
    /// Returns the number of instances, or `None` for an undeclared position.
    pub fn run(&mut self, position: usize, segments: &[Segment]) -> Option<usize> {
        let entry = self.entries.get_mut(&position)?;
        let instances = extract(entry.spec.identifiers(), segments);
        let count = instances.len();
        entry.contents = Some(instances);

        debug!(position, instances = count, "Extracted loop");
        Some(count)
    }

    /// Extract every declared loop independently against the same segments
    pub fn run_all(&mut self, segments: &[Segment]) {
        for entry in self.entries.values_mut() {
            let instances = extract(entry.spec.identifiers(), segments);
            debug!(
                position = entry.spec.position(),
                instances = instances.len(),
                "Extracted loop"
            );
            entry.contents = Some(instances);
        }
    }

    /// Loop declared at a position
    pub fn get(&self, position: usize) -> Option<&LoopSpec> {
        self.entries.get(&position).map(LoopEntry::spec)
    }

    /// Extracted instances of a loop; `None` if undeclared or not yet run
    pub fn contents(&self, position: usize) -> Option<&[LoopInstance]> {
        self.entries.get(&position).and_then(LoopEntry::contents)
    }

    /// Whether extraction has run for a loop
    pub fn is_populated(&self, position: usize) -> bool {
        self.contents(position).is_some()
    }

    /// Smallest position above every declared one
    pub fn next_position(&self) -> usize {
        self.entries.keys().next_back().map_or(0, |last| last + 1)
    }

    /// Entries in position order
    pub fn iter(&self) -> impl Iterator<Item = &LoopEntry> {
        self.entries.values()
    }

    /// Number of declared loops
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no loop is declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
