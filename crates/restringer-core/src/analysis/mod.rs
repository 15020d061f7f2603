//! Side tables over the arena: parent links, per-kind buckets in source
//! order, the scope tree and the declaration/reference graph. Rebuilt from
//! the root after every commit; rules only ever read them.

pub mod scope;

pub use scope::{ScopeData, ScopeId, ScopeKind, ScopeTree};

use restringer_parser::ast::{Ast, Node, NodeId, NodeKind};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: NodeId,
    /// Field name in the parent referring to this node.
    pub key: &'static str,
    /// Position for array-valued slots.
    pub index: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Indexes {
    parents: FxHashMap<NodeId, ParentLink>,
    buckets: FxHashMap<NodeKind, Vec<NodeId>>,
    pub scopes: ScopeTree,
    /// Use identifier → declaring identifier. Declarations themselves are
    /// not present (their "declaration" is the node itself).
    decl_of: FxHashMap<NodeId, NodeId>,
    /// Declaring identifier → uses, in source order, excluding itself.
    refs_of: FxHashMap<NodeId, Vec<NodeId>>,
    decl_idents: FxHashSet<NodeId>,
}

/// Rebuilds every index from the tree reachable from the root.
pub fn build_indexes(ast: &Ast) -> Indexes {
    let mut indexes = Indexes::default();
    collect_structure(ast, ast.root(), &mut indexes);

    let (scopes, decl_idents) = scope::build_scopes(ast);
    indexes.scopes = scopes;
    indexes.decl_idents = decl_idents.into_iter().collect();

    resolve_references(ast, &mut indexes);
    indexes
}

fn collect_structure(ast: &Ast, id: NodeId, indexes: &mut Indexes) {
    indexes
        .buckets
        .entry(ast.kind(id))
        .or_default()
        .push(id);
    for edge in ast.child_edges(id) {
        indexes.parents.insert(
            edge.id,
            ParentLink {
                parent: id,
                key: edge.key,
                index: edge.index,
            },
        );
        collect_structure(ast, edge.id, indexes);
    }
}

fn resolve_references(ast: &Ast, indexes: &mut Indexes) {
    let identifiers = indexes
        .buckets
        .get(&NodeKind::Identifier)
        .cloned()
        .unwrap_or_default();
    for id in identifiers {
        if indexes.decl_idents.contains(&id) || !is_reference_position(ast, indexes, id) {
            continue;
        }
        let Some(name) = ast.ident_name(id) else { continue };
        let Some(scope) = indexes.scopes.scope_of(id) else { continue };
        if let Some(decl) = indexes.scopes.lookup(scope, name) {
            indexes.decl_of.insert(id, decl);
            indexes.refs_of.entry(decl).or_default().push(id);
        }
    }
}

/// Whether an identifier node is a name *use* rather than a fixed label
/// (non-computed member property, non-computed object/class key).
fn is_reference_position(ast: &Ast, indexes: &Indexes, id: NodeId) -> bool {
    let Some(link) = indexes.parents.get(&id) else {
        return true;
    };
    match ast.node(link.parent) {
        Node::MemberExpression { computed, .. } => link.key != "property" || *computed,
        Node::Property { computed, .. } | Node::MethodDefinition { computed, .. } => {
            link.key != "key" || *computed
        }
        _ => true,
    }
}

impl Indexes {
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).map(|l| l.parent)
    }

    pub fn parent_link(&self, id: NodeId) -> Option<&ParentLink> {
        self.parents.get(&id)
    }

    /// Nodes of `kind` in source (pre-)order; empty when none exist.
    pub fn of_kind(&self, kind: NodeKind) -> &[NodeId] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declaring identifier for a use; `None` for globals/built-ins.
    pub fn decl_of(&self, id: NodeId) -> Option<NodeId> {
        self.decl_of.get(&id).copied()
    }

    /// All uses bound to a declaring identifier (excluding the declaration).
    pub fn refs_of(&self, decl: NodeId) -> &[NodeId] {
        self.refs_of.get(&decl).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_declaration(&self, id: NodeId) -> bool {
        self.decl_idents.contains(&id)
    }

    /// Chain of enclosing nodes from the root down to `id`, inclusive.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.parent(id) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Innermost statement containing `id`: the ancestor sitting directly
    /// in a statement list (program/block body, switch-case consequent).
    pub fn enclosing_statement(&self, ast: &Ast, mut id: NodeId) -> Option<NodeId> {
        loop {
            let link = self.parent_link(id)?;
            let in_list = matches!(
                (ast.kind(link.parent), link.key),
                (NodeKind::Program, "body")
                    | (NodeKind::BlockStatement, "body")
                    | (NodeKind::SwitchCase, "consequent")
            );
            if in_list {
                return Some(id);
            }
            id = link.parent;
        }
    }

    /// The top-level (program-body) statement containing `id`.
    pub fn top_level_statement(&self, ast: &Ast, mut id: NodeId) -> Option<NodeId> {
        loop {
            let link = self.parent_link(id)?;
            if ast.kind(link.parent) == NodeKind::Program {
                return Some(id);
            }
            id = link.parent;
        }
    }

    /// Whether the identifier at `id` is written to (assignment target,
    /// update operand, or for-in/of loop variable).
    pub fn is_write_target(&self, ast: &Ast, id: NodeId) -> bool {
        let Some(link) = self.parent_link(id) else {
            return false;
        };
        match ast.node(link.parent) {
            Node::AssignmentExpression { left, .. } => *left == id,
            Node::UpdateExpression { .. } => true,
            Node::ForInStatement { left, .. } | Node::ForOfStatement { left, .. } => *left == id,
            _ => false,
        }
    }

    /// Whether any reference bound to `decl` writes to it.
    pub fn references_modified(&self, ast: &Ast, decl: NodeId) -> bool {
        self.refs_of(decl).iter().any(|r| self.is_write_target(ast, *r))
    }

    /// Asserts the declaration/reference graph invariants; used after
    /// commit in debug builds and by analysis tests.
    pub fn check_reference_integrity(&self) -> std::result::Result<(), String> {
        for (use_id, decl) in &self.decl_of {
            let refs = self.refs_of(*decl);
            let count = refs.iter().filter(|r| **r == *use_id).count();
            if count != 1 {
                return Err(format!(
                    "{use_id} appears {count} times in references of {decl}"
                ));
            }
        }
        for (decl, refs) in &self.refs_of {
            for r in refs {
                if self.decl_of(*r) != Some(*decl) {
                    return Err(format!("{r} listed under {decl} but bound elsewhere"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restringer_parser::parse_program;

    fn indexed(source: &str) -> (Ast, Indexes) {
        let ast = parse_program(source).expect("parse failure");
        let indexes = build_indexes(&ast);
        (ast, indexes)
    }

    #[test]
    fn buckets_are_in_source_order() {
        let (ast, indexes) = indexed("var a = 1; var b = 2; var c = 3;");
        let decls = indexes.of_kind(NodeKind::VariableDeclaration);
        assert_eq!(decls.len(), 3);
        let spans: Vec<u32> = decls.iter().map(|d| ast.span(*d).start).collect();
        let mut sorted = spans.clone();
        sorted.sort_unstable();
        assert_eq!(spans, sorted);
    }

    #[test]
    fn references_bind_to_declarations() {
        let (ast, indexes) = indexed("var a = 1; f(a); g(a);");
        let mut decl = None;
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(*id) == Some("a") && indexes.is_declaration(*id) {
                decl = Some(*id);
            }
        }
        let decl = decl.expect("declaration of a not found");
        assert_eq!(indexes.refs_of(decl).len(), 2);
        indexes.check_reference_integrity().unwrap();
    }

    #[test]
    fn globals_have_no_declaration() {
        let (ast, indexes) = indexed("console.log(1);");
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(id.to_owned()) == Some("console") {
                assert!(indexes.decl_of(*id).is_none());
            }
        }
    }

    #[test]
    fn member_property_names_are_not_references() {
        let (ast, indexes) = indexed("var a = 1; obj.a = 2; obj['a'] = 3;");
        let mut decl = None;
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(*id) == Some("a") && indexes.is_declaration(*id) {
                decl = Some(*id);
            }
        }
        assert_eq!(
            indexes.refs_of(decl.unwrap()).len(),
            0,
            "obj.a must not count as a use of variable a"
        );
    }

    #[test]
    fn var_hoists_to_function_scope() {
        let (ast, indexes) = indexed("function f() { if (x) { var v = 1; } return v; }");
        let mut bound = false;
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(*id) == Some("v") && !indexes.is_declaration(*id) {
                bound = indexes.decl_of(*id).is_some();
            }
        }
        assert!(bound, "hoisted var must be visible at function level");
    }

    #[test]
    fn let_is_block_scoped() {
        let (ast, indexes) = indexed("{ let v = 1; } v;");
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(*id) == Some("v") && !indexes.is_declaration(*id) {
                assert!(
                    indexes.decl_of(*id).is_none(),
                    "block-scoped let must not leak"
                );
            }
        }
    }

    #[test]
    fn write_detection() {
        let (ast, indexes) = indexed("var a = 1; a = 2; a++; f(a);");
        let mut decl = None;
        for id in indexes.of_kind(NodeKind::Identifier) {
            if ast.ident_name(*id) == Some("a") && indexes.is_declaration(*id) {
                decl = Some(*id);
            }
        }
        let decl = decl.unwrap();
        assert!(indexes.references_modified(&ast, decl));
        let writes = indexes
            .refs_of(decl)
            .iter()
            .filter(|r| indexes.is_write_target(&ast, **r))
            .count();
        assert_eq!(writes, 2);
    }
}
