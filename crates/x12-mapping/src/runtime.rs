//! Mapping runtime
//!
//! Folds a schema tree over a segment scope. Leaves read one field of one
//! segment, branches map their own sub-schema once per extracted loop
//! instance (with that instance as the new scope), and nested objects recurse
//! with the current scope.
//!
//! Resolution never fails. A missing segment, field, qualifier or loop leaves
//! its key out of the result; the reason is logged at `debug`. A branch whose
//! loop is undeclared or has not been extracted is left out, while a loop
//! extracted with zero instances maps to an empty array.

use serde_json::{Map, Value};
use tracing::debug;
use x12_ir::{Document, Segment};
use x12_schema::{FieldLeaf, LoopBranch, SchemaNode, SchemaObject};

use crate::loops::LoopSet;

/// Engine resolving schema trees against segments and extracted loops
#[derive(Debug, Clone, Copy)]
pub struct MappingEngine<'a> {
    loops: &'a LoopSet,
}

impl<'a> MappingEngine<'a> {
    /// Create an engine reading loop instances from `loops`
    pub fn new(loops: &'a LoopSet) -> Self {
        Self { loops }
    }

    /// Map a schema against every segment of a document
    pub fn map_document(&self, schema: &SchemaObject, document: &Document) -> Map<String, Value> {
        self.map(schema, document.segments())
    }

    /// Map a schema against an arbitrary segment scope
    pub fn map(&self, schema: &SchemaObject, scope: &[Segment]) -> Map<String, Value> {
        self.map_object(schema, scope, "")
    }

    fn map_object(
        &self,
        object: &SchemaObject,
        scope: &[Segment],
        path: &str,
    ) -> Map<String, Value> {
        let mut result = Map::new();

        for (key, node) in object.iter() {
            let path = if path.is_empty() {
                key.to_string()
            } else {
                format!("{path}.{key}")
            };

            let value = match node {
                SchemaNode::Leaf(leaf) => {
                    leaf_value(leaf, scope, &path).map(|v| Value::String(v.to_string()))
                }
                SchemaNode::Branch(branch) => self.map_branch(branch, &path).map(Value::Array),
                SchemaNode::Object(nested) => {
                    Some(Value::Object(self.map_object(nested, scope, &path)))
                }
            };

            if let Some(value) = value {
                result.insert(key.to_string(), value);
            }
        }

        result
    }

    fn map_branch(&self, branch: &LoopBranch, path: &str) -> Option<Vec<Value>> {
        let Some(instances) = self.loops.contents(branch.loop_ref) else {
            debug!(path, loop_ref = branch.loop_ref, "Loop not declared or not extracted");
            return None;
        };

        Some(
            instances
                .iter()
                .map(|instance| Value::Object(self.map_object(&branch.fields, instance, path)))
                .collect(),
        )
    }

    /// Resolve a single leaf against a scope
    pub fn resolve_leaf<'s>(leaf: &FieldLeaf, scope: &'s [Segment]) -> Option<&'s str> {
        leaf_value(leaf, scope, &leaf.segment)
    }
}

/// Pick the segment a leaf reads from.
///
/// One candidate is used as is. Among several candidates the first whose
/// qualifier field matches wins; without a qualifier the first candidate is
/// read.
fn select_segment<'s>(leaf: &FieldLeaf, scope: &'s [Segment], path: &str) -> Option<&'s Segment> {
    let candidates: Vec<&Segment> = scope.iter().filter(|s| s.is(&leaf.segment)).collect();

    match (candidates.as_slice(), &leaf.qualifier) {
        ([], _) => {
            debug!(path, segment = %leaf.segment, "Segment not found");
            None
        }
        ([single], _) => Some(*single),
        (many, Some(qualifier)) => {
            let found = many
                .iter()
                .copied()
                .find(|s| s.element(qualifier.index) == Some(qualifier.value.as_str()));
            if found.is_none() {
                debug!(
                    path,
                    segment = %leaf.segment,
                    qualifier = %qualifier.value,
                    "No candidate segment carries the qualifier"
                );
            }
            found
        }
        (many, None) => {
            debug!(
                path,
                segment = %leaf.segment,
                candidates = many.len(),
                "Several candidate segments and no qualifier, reading the first"
            );
            many.first().copied()
        }
    }
}

fn leaf_value<'s>(leaf: &FieldLeaf, scope: &'s [Segment], path: &str) -> Option<&'s str> {
    let segment = select_segment(leaf, scope, path)?;

    if let Some(qualifier) = &leaf.qualifier {
        let actual = segment.element(qualifier.index);
        if actual != Some(qualifier.value.as_str()) {
            debug!(
                path,
                expected = %qualifier.value,
                actual = actual.unwrap_or_default(),
                "Invalid qualifier value"
            );
            return None;
        }
    }

    let value = segment.element(leaf.value_index);
    if value.is_none() {
        debug!(path, index = leaf.value_index, "Field not found");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use x12_schema::LoopSpec;

    const ENROLLMENT: &str = "ST*834*0001\nINS*Y*18\nREF*0F*ABC\nINS*Y*19\nREF*0F*XYZ";

    fn extract_all(doc: &Document, loops: &mut LoopSet) {
        loops.run_all(doc.segments());
    }

    #[test]
    fn test_unconditional_leaf_reads_first_match() {
        let doc = Document::parse(ENROLLMENT);
        let leaf = FieldLeaf::new("INS", 0);
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("Y"));
    }

    #[test]
    fn test_single_match_returns_value() {
        let doc = Document::parse(ENROLLMENT);
        let leaf = FieldLeaf::new("ST", 1);
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("0001"));
    }

    #[test]
    fn test_out_of_range_value_is_omitted() {
        let doc = Document::parse(ENROLLMENT);
        let leaf = FieldLeaf::new("ST", 7);
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), None);
    }

    #[test]
    fn test_missing_segment_is_omitted() {
        let loops = LoopSet::new();
        let doc = Document::parse(ENROLLMENT);
        let schema = SchemaObject::new()
            .with("type", FieldLeaf::new("ST", 0))
            .with("sponsor", FieldLeaf::new("N1", 1));

        let result = MappingEngine::new(&loops).map_document(&schema, &doc);
        assert_eq!(Value::Object(result), json!({"type": "834"}));
    }

    #[test]
    fn test_qualifier_selects_among_candidates() {
        let doc = Document::parse("REF*0F*SUB\nREF*1L*GROUP\nREF*17*CLIENT");
        let leaf = FieldLeaf::new("REF", 1).qualified(0, "1L");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("GROUP"));
    }

    #[test]
    fn test_qualifier_without_survivor_is_omitted() {
        let doc = Document::parse("REF*0F*SUB\nREF*1L*GROUP");
        let leaf = FieldLeaf::new("REF", 1).qualified(0, "ZZ");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), None);
    }

    #[test]
    fn test_single_candidate_still_checks_qualifier() {
        let doc = Document::parse("REF*1L*GROUP");
        let leaf = FieldLeaf::new("REF", 1).qualified(0, "0F");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), None);

        let leaf = FieldLeaf::new("REF", 1).qualified(0, "1L");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("GROUP"));
    }

    #[test]
    fn test_several_candidates_without_qualifier_read_first() {
        let doc = Document::parse("REF*0F*SUB\nREF*1L*GROUP");
        let leaf = FieldLeaf::new("REF", 1);
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("SUB"));
    }

    #[test]
    fn test_qualifier_index_out_of_range_is_omitted() {
        let doc = Document::parse("REF\nREF*0F*SUB");
        let leaf = FieldLeaf::new("REF", 1).qualified(0, "0F");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), Some("SUB"));

        let doc = Document::parse("REF");
        assert_eq!(MappingEngine::resolve_leaf(&leaf, doc.segments()), None);
    }

    #[test]
    fn test_nested_objects_share_scope() {
        let loops = LoopSet::new();
        let doc = Document::parse(ENROLLMENT);
        let schema = SchemaObject::new().with(
            "header",
            SchemaObject::new().with(
                "ST",
                SchemaObject::new()
                    .with("type", FieldLeaf::new("ST", 0))
                    .with("control", FieldLeaf::new("ST", 1)),
            ),
        );

        let result = MappingEngine::new(&loops).map_document(&schema, &doc);
        assert_eq!(
            Value::Object(result),
            json!({"header": {"ST": {"type": "834", "control": "0001"}}})
        );
    }

    #[test]
    fn test_branch_maps_each_instance() {
        let doc = Document::parse(ENROLLMENT);
        let mut loops = LoopSet::new();
        loops.declare(LoopSpec::new(0, ["INS", "REF"]).unwrap()).unwrap();
        extract_all(&doc, &mut loops);

        let member = SchemaObject::new()
            .with("relationship", FieldLeaf::new("INS", 1))
            .with("number", FieldLeaf::new("REF", 1).qualified(0, "0F"));
        let schema = SchemaObject::new().with("members", LoopBranch::new(0, member));

        let result = MappingEngine::new(&loops).map_document(&schema, &doc);
        assert_eq!(
            Value::Object(result),
            json!({"members": [
                {"relationship": "18", "number": "ABC"},
                {"relationship": "19", "number": "XYZ"}
            ]})
        );
    }

    #[test]
    fn test_branch_on_unextracted_loop_is_omitted() {
        let doc = Document::parse(ENROLLMENT);
        let mut loops = LoopSet::new();
        loops.declare(LoopSpec::new(0, ["INS", "REF"]).unwrap()).unwrap();

        let schema = SchemaObject::new()
            .with("members", LoopBranch::new(0, SchemaObject::new()))
            .with("others", LoopBranch::new(9, SchemaObject::new()));

        let result = MappingEngine::new(&loops).map_document(&schema, &doc);
        assert!(result.is_empty());
    }

    #[test]
    fn test_branch_with_no_instances_is_empty_array() {
        let doc = Document::parse("ST*834*0001");
        let mut loops = LoopSet::new();
        loops.declare(LoopSpec::new(0, ["INS", "REF"]).unwrap()).unwrap();
        extract_all(&doc, &mut loops);

        let schema = SchemaObject::new().with("members", LoopBranch::new(0, SchemaObject::new()));
        let result = MappingEngine::new(&loops).map_document(&schema, &doc);
        assert_eq!(Value::Object(result), json!({"members": []}));
    }
}
