//! Tree to query document compiler
//!
//! Compilation is a direct structural translation with no optimisation:
//! children keep their tree order, leaf payloads pass through verbatim and
//! temporal constraints are sorted into a canonical order. The only shape
//! change is that empty non-root groups are left out.

use crate::fingerprint::Fingerprint;
use crate::model::{
    CompiledConstraint, CompiledGroup, CompiledLeaf, CompiledNode, PopulationScope, QueryDocument,
    REQUEST_TYPE,
};
use crate::serialize::{DocumentSerializer, JsonSerializer, SerializeError};
use cohort_diagnostics::{COH0400, COH0403, CohortError, ErrorCode};
use cohort_temporal::{ConstraintFamily, ConstraintSet, ConstraintTarget};
use cohort_tree::{CriteriaTree, GroupNode, NodeId, NodeRef};
use serde::{Deserialize, Serialize};

/// Wire format version written when none is configured
pub const DEFAULT_VERSION: &str = "v1.4";

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    pub version: String,
    /// Pretty-print the serialized document
    pub pretty: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            pretty: false,
        }
    }
}

/// Errors raised while compiling
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Group references node {id} which is not in the tree")]
    DanglingReference { id: NodeId },

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl CompileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DanglingReference { .. } => COH0400,
            Self::Serialize(_) => COH0403,
        }
    }
}

impl From<CompileError> for CohortError {
    fn from(err: CompileError) -> Self {
        CohortError::system(err.code(), err.to_string())
    }
}

/// Output of one compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub document: QueryDocument,
    /// The document as sent to the count service
    pub serialized: String,
    /// Hash of the compact serialization, independent of `pretty`
    pub fingerprint: Fingerprint,
}

/// Compiles criteria trees into query documents
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    options: CompilerOptions,
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Build the document for `tree`, `constraints` and `scope`
    pub fn document(
        &self,
        tree: &CriteriaTree,
        constraints: &ConstraintSet,
        scope: &PopulationScope,
    ) -> Result<QueryDocument, CompileError> {
        let root = self
            .compile_group(tree, tree.root())?
            .unwrap_or_else(|| CompiledGroup {
                id: NodeId::ROOT,
                combinator: tree.root().combinator,
                is_inclusive: tree.root().is_inclusive,
                children: Vec::new(),
            });

        let mut temporal_constraints: Vec<CompiledConstraint> = constraints
            .iter()
            .map(|c| CompiledConstraint {
                family: c.family,
                kind: c.kind,
                criteria: c.target.clone(),
            })
            .collect();
        // family, globals first, then by ids
        temporal_constraints.sort_by(|a, b| {
            sort_key(a)
                .cmp(&sort_key(b))
                .then_with(|| a.kind.name().cmp(b.kind.name()))
        });

        Ok(QueryDocument {
            version: self.options.version.clone(),
            document_type: REQUEST_TYPE.to_string(),
            scope: scope.normalized(),
            root,
            temporal_constraints,
        })
    }

    /// Compile, serialize and fingerprint
    pub fn compile(
        &self,
        tree: &CriteriaTree,
        constraints: &ConstraintSet,
        scope: &PopulationScope,
    ) -> Result<CompiledQuery, CompileError> {
        let document = self.document(tree, constraints, scope)?;
        let compact = JsonSerializer::new().serialize(&document)?;
        let fingerprint = Fingerprint::of(&compact);
        let serialized = if self.options.pretty {
            JsonSerializer::pretty().serialize(&document)?
        } else {
            compact
        };
        log::debug!(
            "compiled {} leaves and {} temporal constraints, fingerprint {}",
            document.leaf_count(),
            document.temporal_constraints.len(),
            fingerprint.short()
        );
        Ok(CompiledQuery {
            document,
            serialized,
            fingerprint,
        })
    }

    /// `None` for an empty non-root group
    fn compile_group(
        &self,
        tree: &CriteriaTree,
        group: &GroupNode,
    ) -> Result<Option<CompiledGroup>, CompileError> {
        let mut children = Vec::with_capacity(group.children.len());
        for child in &group.children {
            match tree.get(*child) {
                Some(NodeRef::Leaf(leaf)) => children.push(CompiledNode::Leaf(CompiledLeaf {
                    id: leaf.id,
                    kind: leaf.kind.as_str().to_string(),
                    is_inclusive: leaf.is_inclusive,
                    payload: leaf.payload.clone(),
                })),
                Some(NodeRef::Group(inner)) => {
                    if let Some(compiled) = self.compile_group(tree, inner)? {
                        children.push(CompiledNode::Group(compiled));
                    }
                }
                None => return Err(CompileError::DanglingReference { id: *child }),
            }
        }
        if children.is_empty() && !group.id.is_root() {
            return Ok(None);
        }
        Ok(Some(CompiledGroup {
            id: group.id,
            combinator: group.combinator,
            is_inclusive: group.is_inclusive,
            children,
        }))
    }
}

fn sort_key(constraint: &CompiledConstraint) -> (ConstraintFamily, bool, &[NodeId]) {
    match &constraint.criteria {
        ConstraintTarget::All => (constraint.family, false, [].as_slice()),
        ConstraintTarget::Partial(ids) => (constraint.family, true, ids),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_tree::{Combinator, NewLeaf};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_groups_are_not_emitted() {
        let mut tree = CriteriaTree::new();
        let outer = tree.add_group(NodeId::ROOT, Combinator::Any, true).unwrap();
        tree.add_group(outer, Combinator::All, true).unwrap();
        let kept = tree.add_group(NodeId::ROOT, Combinator::All, false).unwrap();
        let leaf = tree
            .add_leaf(kept, NewLeaf::new("Condition", json!({"code": "E11"})))
            .unwrap();

        let doc = QueryCompiler::new()
            .document(&tree, &ConstraintSet::new(), &PopulationScope::default())
            .unwrap();

        assert_eq!(doc.root.children.len(), 1);
        let CompiledNode::Group(group) = &doc.root.children[0] else {
            panic!("expected group");
        };
        assert_eq!(group.id, kept);
        assert!(!group.is_inclusive);
        assert_eq!(group.children[0].id(), leaf);
        assert_eq!(doc.leaf_count(), 1);
    }

    #[test]
    fn test_empty_tree_matches_everything() {
        let query = QueryCompiler::new()
            .compile(&CriteriaTree::new(), &ConstraintSet::new(), &PopulationScope::default())
            .unwrap();
        assert!(query.document.matches_everything());
        assert_eq!(query.document.version, DEFAULT_VERSION);
        assert_eq!(query.document.document_type, "request");
    }

    #[test]
    fn test_pretty_output_keeps_fingerprint() {
        let mut tree = CriteriaTree::new();
        tree.add_leaf(NodeId::ROOT, NewLeaf::new("Patient", json!({"age": [18, 65]})))
            .unwrap();
        let scope = PopulationScope::default();

        let compact = QueryCompiler::new()
            .compile(&tree, &ConstraintSet::new(), &scope)
            .unwrap();
        let pretty = QueryCompiler::with_options(CompilerOptions {
            pretty: true,
            ..CompilerOptions::default()
        })
        .compile(&tree, &ConstraintSet::new(), &scope)
        .unwrap();

        assert_ne!(compact.serialized, pretty.serialized);
        assert!(pretty.serialized.contains('\n'));
        assert_eq!(compact.fingerprint, pretty.fingerprint);
    }

    #[test]
    fn test_scope_is_normalized() {
        let scope = PopulationScope::new(["b", "a", "b"], cohort_tree::AccessLevel::DeIdentified);
        let doc = QueryCompiler::new()
            .document(&CriteriaTree::new(), &ConstraintSet::new(), &scope)
            .unwrap();
        assert_eq!(doc.scope.perimeter_ids, vec!["a".to_string(), "b".to_string()]);
    }
}
