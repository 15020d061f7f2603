//! Staging layer over the arena: rules mark replacements and deletions,
//! and the driver commits them in one batch at the end of a pass, after
//! which every index is rebuilt. Rules never observe partial edits: all
//! reads during a pass see the pre-commit tree.

use crate::analysis::{build_indexes, Indexes};
use crate::{EngineError, Result};
use restringer_parser::ast::{Ast, NodeId, NodeKind, RemoveOutcome};
use restringer_parser::{emit_program, parse_program, Span};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditAction {
    Replace(NodeId),
    Remove,
}

#[derive(Debug, Clone, Copy)]
struct Edit {
    target: NodeId,
    action: EditAction,
}

#[derive(Debug)]
pub struct Arborist {
    ast: Ast,
    indexes: Indexes,
    pending: Vec<Edit>,
    /// Source ranges of nodes already marked this pass; candidates whose
    /// range falls inside one are stale and must be skipped.
    touched: Vec<Span>,
}

impl Arborist {
    pub fn parse(source: &str) -> Result<Self> {
        let ast = parse_program(source)?;
        let indexes = build_indexes(&ast);
        Ok(Arborist {
            ast,
            indexes,
            pending: Vec::new(),
            touched: Vec::new(),
        })
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Mutable arena access for building replacement subtrees. Rules must
    /// only *allocate* through this; existing nodes are edited solely via
    /// `mark_node` / `mark_node_replaced` + `commit`.
    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub fn indexes(&self) -> &Indexes {
        &self.indexes
    }

    /// Stages deletion of `target`.
    pub fn mark_node(&mut self, target: NodeId) {
        trace!(%target, "mark delete");
        self.touched.push(self.ast.span(target));
        self.pending.push(Edit {
            target,
            action: EditAction::Remove,
        });
    }

    /// Stages structural replacement of `target` with a freshly built
    /// subtree rooted at `replacement`.
    pub fn mark_node_replaced(&mut self, target: NodeId, replacement: NodeId) {
        trace!(%target, %replacement, "mark replace");
        self.touched.push(self.ast.span(target));
        self.pending.push(Edit {
            target,
            action: EditAction::Replace(replacement),
        });
    }

    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    /// Whether `id` lies inside a source range already marked this pass.
    /// Synthetic (rule-built) nodes are never stale.
    pub fn is_stale(&self, id: NodeId) -> bool {
        let span = self.ast.span(id);
        if span.is_synthetic() {
            return false;
        }
        self.touched.iter().any(|t| t.contains(&span))
    }

    pub fn emit(&self) -> String {
        emit_program(&self.ast)
    }

    /// Applies all pending edits in one batch and rebuilds the indexes.
    /// Conflicting edits on one node resolve to the last one marked; edits
    /// whose target was detached by an earlier edit are dropped. Returns
    /// `true` when at least one edit was applied.
    pub fn commit(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            self.touched.clear();
            return Ok(false);
        }

        // Last mark per target wins, original order otherwise preserved.
        let mut last: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (i, edit) in self.pending.iter().enumerate() {
            last.insert(edit.target, i);
        }
        let edits: Vec<Edit> = self
            .pending
            .iter()
            .enumerate()
            .filter(|(i, e)| last[&e.target] == *i)
            .map(|(_, e)| *e)
            .collect();
        self.pending.clear();
        self.touched.clear();

        let mut displaced: FxHashSet<NodeId> = FxHashSet::default();
        let mut applied = 0usize;
        for edit in edits {
            if self.is_displaced(edit.target, &displaced) {
                continue;
            }
            match edit.action {
                EditAction::Replace(replacement) => {
                    match self.indexes.parent(edit.target) {
                        Some(parent) => {
                            self.ast
                                .replace_child(parent, edit.target, replacement)
                                .map_err(|e| EngineError::Commit(e.to_string()))?;
                        }
                        None => {
                            // Replacing the root: splicing rules rebuild the
                            // whole `Program`; copy it into the root slot so
                            // the root id stays stable.
                            if edit.target != self.ast.root()
                                || self.ast.kind(replacement) != NodeKind::Program
                            {
                                return Err(EngineError::Commit(
                                    "only the program root may replace the root".to_string(),
                                ));
                            }
                            let node = self.ast.node(replacement).clone();
                            *self.ast.node_mut(edit.target) = node;
                        }
                    }
                    displaced.insert(edit.target);
                    applied += 1;
                }
                EditAction::Remove => {
                    self.remove_recursive(edit.target, &mut displaced)?;
                    applied += 1;
                }
            }
        }

        self.reindex()?;
        debug!(applied, nodes = self.ast.len(), "commit complete");
        Ok(applied > 0)
    }

    fn is_displaced(&self, mut id: NodeId, displaced: &FxHashSet<NodeId>) -> bool {
        loop {
            if displaced.contains(&id) {
                return true;
            }
            match self.indexes.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn remove_recursive(&mut self, target: NodeId, displaced: &mut FxHashSet<NodeId>) -> Result<()> {
        let Some(parent) = self.indexes.parent(target) else {
            return Err(EngineError::Commit(
                "cannot remove the program root".to_string(),
            ));
        };
        match self
            .ast
            .remove_child(parent, target)
            .map_err(|e| EngineError::Commit(e.to_string()))?
        {
            RemoveOutcome::Removed | RemoveOutcome::ReplacedWithEmpty(_) => {
                displaced.insert(target);
                Ok(())
            }
            RemoveOutcome::RemoveParent => {
                displaced.insert(target);
                self.remove_recursive(parent, displaced)
            }
        }
    }

    /// Rebuilds all side tables and checks structural integrity: every
    /// reachable node must be reachable exactly once.
    fn reindex(&mut self) -> Result<()> {
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        let mut duplicate = None;
        self.walk_check(self.ast.root(), &mut seen, &mut duplicate);
        if let Some(dup) = duplicate {
            return Err(EngineError::Commit(format!(
                "node {dup} is referenced from two parents"
            )));
        }
        self.indexes = build_indexes(&self.ast);
        debug_assert!(self.indexes.check_reference_integrity().is_ok());
        Ok(())
    }

    fn walk_check(
        &self,
        id: NodeId,
        seen: &mut FxHashSet<NodeId>,
        duplicate: &mut Option<NodeId>,
    ) {
        if duplicate.is_some() {
            return;
        }
        if !seen.insert(id) {
            *duplicate = Some(id);
            return;
        }
        for child in self.ast.children(id) {
            self.walk_check(child, seen, duplicate);
        }
    }

    // ------------------------------------------------------------------
    // Read-side conveniences shared by many rules
    // ------------------------------------------------------------------

    /// Nodes of `kind` that are not stale, in source order.
    pub fn live_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.indexes
            .of_kind(kind)
            .iter()
            .copied()
            .filter(|id| !self.is_stale(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restringer_parser::ast::NodeKind;

    #[test]
    fn replace_commits_and_reindexes() {
        let mut arb = Arborist::parse("var x = 1 + 2;").unwrap();
        let binary = arb.indexes().of_kind(NodeKind::BinaryExpression)[0];
        let lit = arb.ast_mut().lit_number(3.0);
        arb.mark_node_replaced(binary, lit);
        assert!(arb.commit().unwrap());
        assert_eq!(arb.emit(), "var x = 3;\n");
        assert!(arb.indexes().of_kind(NodeKind::BinaryExpression).is_empty());
    }

    #[test]
    fn no_edits_is_a_noop_commit() {
        let mut arb = Arborist::parse("f();").unwrap();
        assert!(!arb.commit().unwrap());
        assert_eq!(arb.emit(), "f();\n");
    }

    #[test]
    fn last_mark_wins_on_conflict() {
        let mut arb = Arborist::parse("var x = 1 + 2;").unwrap();
        let binary = arb.indexes().of_kind(NodeKind::BinaryExpression)[0];
        let first = arb.ast_mut().lit_number(99.0);
        let second = arb.ast_mut().lit_number(3.0);
        arb.mark_node_replaced(binary, first);
        arb.mark_node_replaced(binary, second);
        arb.commit().unwrap();
        assert_eq!(arb.emit(), "var x = 3;\n");
    }

    #[test]
    fn stale_detection_covers_inner_ranges() {
        let arb_src = "f(1 + 2);";
        let mut arb = Arborist::parse(arb_src).unwrap();
        let binary = arb.indexes().of_kind(NodeKind::BinaryExpression)[0];
        let inner_literal = arb.indexes().of_kind(NodeKind::Literal)[0];
        let lit = arb.ast_mut().lit_number(3.0);
        arb.mark_node_replaced(binary, lit);
        assert!(arb.is_stale(inner_literal), "literal inside marked range");
        assert!(!arb.is_stale(lit), "synthetic nodes are never stale");
    }

    #[test]
    fn edits_inside_replaced_subtrees_are_dropped() {
        let mut arb = Arborist::parse("f(1 + 2);").unwrap();
        let binary = arb.indexes().of_kind(NodeKind::BinaryExpression)[0];
        let inner_literal = arb.indexes().of_kind(NodeKind::Literal)[0];
        let lit = arb.ast_mut().lit_number(3.0);
        arb.mark_node_replaced(binary, lit);
        let other = arb.ast_mut().lit_number(42.0);
        arb.mark_node_replaced(inner_literal, other);
        arb.commit().unwrap();
        assert_eq!(arb.emit(), "f(3);\n");
    }

    #[test]
    fn removing_sole_declarator_removes_declaration() {
        let mut arb = Arborist::parse("var unused = 1;\nf();").unwrap();
        let declarator = arb.indexes().of_kind(NodeKind::VariableDeclarator)[0];
        arb.mark_node(declarator);
        arb.commit().unwrap();
        assert_eq!(arb.emit(), "f();\n");
    }

    #[test]
    fn removing_loop_body_keeps_syntax_valid() {
        let mut arb = Arborist::parse("while (cond()) body();").unwrap();
        let body = {
            let whiles = arb.indexes().of_kind(NodeKind::WhileStatement);
            match arb.ast().node(whiles[0]) {
                restringer_parser::Node::WhileStatement { body, .. } => *body,
                _ => unreachable!(),
            }
        };
        arb.mark_node(body);
        arb.commit().unwrap();
        assert_eq!(arb.emit(), "while (cond()) ;\n");
    }
}
