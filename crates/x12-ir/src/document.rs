//! Document representation and ingest
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].

use crate::field::Field;
use crate::segment::Segment;
use crate::syntax::Delimiters;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Identifier of the transaction-set header segment
pub const TRANSACTION_SET_HEADER: &str = "ST";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// An ordered sequence of segments built once from raw text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Segments in source order
    pub segments: Vec<Segment>,
}

impl Document {
    /// Create a document from already-built segments
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Ingest raw text with the default delimiters (`\n` and `*`)
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, Delimiters::default())
    }

    /// Ingest raw text with explicit delimiters
    ///
    /// Every record becomes one segment, including empty records, so the
    /// segment count always equals the record count. A leading byte order
    /// mark is dropped. No envelope or checksum validation is performed.
    pub fn parse_with(text: &str, delimiters: Delimiters) -> Self {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        let segments: Vec<Segment> = text
            .split(delimiters.segment)
            .map(|line| Segment::parse_line(line, delimiters))
            .inspect(|segment| {
                trace!(name = %segment.name, fields = segment.len(), "Ingested segment");
            })
            .collect();

        debug!(segment_count = segments.len(), "Finished ingest");
        Self { segments }
    }

    /// All segments in source order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First segment with the given identifier
    pub fn find(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.is(name))
    }

    /// All segments with the given identifier, in source order
    pub fn find_all(&self, name: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.is(name)).collect()
    }

    /// Identifiers of all segments, in source order
    pub fn segment_names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the document has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Transaction-set type: the first field of the first `ST` segment
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSegment`] when there is no `ST` segment and
    /// [`Error::MissingElement`] when it carries no fields.
    pub fn transaction_type(&self) -> Result<&Field> {
        let header = self
            .find(TRANSACTION_SET_HEADER)
            .ok_or_else(|| Error::missing_segment(TRANSACTION_SET_HEADER))?;

        header
            .field(0)
            .ok_or_else(|| Error::missing_element(TRANSACTION_SET_HEADER, 0))
    }
}

impl FromIterator<Segment> for Document {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
