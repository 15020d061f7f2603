//! Lexical scope tree and name declaration tables.
//!
//! Two-phase model: this module records scopes and declared names during a
//! single walk; reference resolution (in `analysis`) runs afterwards so
//! `var` hoisting and forward references resolve without a worklist.

use restringer_parser::ast::{Ast, DeclKind, Node, NodeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
}

#[derive(Debug)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Name → declaring identifier node.
    pub declared: FxHashMap<String, NodeId>,
    /// The node that introduced this scope (Program, a function, a block,
    /// a for/switch statement or a catch clause).
    pub owner: NodeId,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
    scope_of: FxHashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    pub fn scope(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.0]
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolves `name` starting from `scope` and walking outwards.
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<NodeId> {
        loop {
            let data = self.scope(scope);
            if let Some(decl) = data.declared.get(name) {
                return Some(*decl);
            }
            scope = data.parent?;
        }
    }

    /// Nearest enclosing function (or program) scope.
    pub fn function_scope(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let data = self.scope(scope);
            if matches!(data.kind, ScopeKind::Function | ScopeKind::Program) {
                return scope;
            }
            match data.parent {
                Some(parent) => scope = parent,
                None => return scope,
            }
        }
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(ScopeData {
            kind,
            parent,
            declared: FxHashMap::default(),
            owner,
        });
        id
    }

    fn declare(&mut self, scope: ScopeId, name: &str, decl: NodeId) {
        // First declaration wins; redeclarations keep pointing at the
        // original so every use resolves to one site.
        self.scopes[scope.0]
            .declared
            .entry(name.to_string())
            .or_insert(decl);
    }

    fn declare_hoisted(&mut self, scope: ScopeId, name: &str, decl: NodeId) {
        let target = self.function_scope(scope);
        self.declare(target, name, decl);
    }
}

/// Builds the scope tree for a whole arena, also returning the set of
/// identifier nodes that are declarations rather than references.
pub fn build_scopes(ast: &Ast) -> (ScopeTree, Vec<NodeId>) {
    let mut tree = ScopeTree::default();
    let mut decl_idents = Vec::new();
    let root = ast.root();
    let program = tree.push(ScopeKind::Program, None, root);
    tree.scope_of.insert(root, program);
    for child in ast.children(root) {
        visit(ast, &mut tree, &mut decl_idents, child, program);
    }
    (tree, decl_idents)
}

fn visit(
    ast: &Ast,
    tree: &mut ScopeTree,
    decl_idents: &mut Vec<NodeId>,
    id: NodeId,
    scope: ScopeId,
) {
    tree.scope_of.insert(id, scope);
    match ast.node(id) {
        Node::FunctionDeclaration {
            id: name,
            params,
            body,
        } => {
            if let Some(n) = ast.ident_name(*name) {
                tree.declare(scope, n, *name);
                decl_idents.push(*name);
            }
            tree.scope_of.insert(*name, scope);
            let inner = tree.push(ScopeKind::Function, Some(scope), id);
            declare_params(ast, tree, decl_idents, params, inner);
            visit_function_body(ast, tree, decl_idents, *body, inner);
        }
        Node::FunctionExpression {
            id: name,
            params,
            body,
        } => {
            let inner = tree.push(ScopeKind::Function, Some(scope), id);
            if let Some(name) = name {
                if let Some(n) = ast.ident_name(*name) {
                    tree.declare(inner, n, *name);
                    decl_idents.push(*name);
                }
                tree.scope_of.insert(*name, inner);
            }
            declare_params(ast, tree, decl_idents, params, inner);
            visit_function_body(ast, tree, decl_idents, *body, inner);
        }
        Node::ArrowFunctionExpression {
            params,
            body,
            expression,
        } => {
            let inner = tree.push(ScopeKind::Function, Some(scope), id);
            declare_params(ast, tree, decl_idents, params, inner);
            if *expression {
                visit(ast, tree, decl_idents, *body, inner);
            } else {
                visit_function_body(ast, tree, decl_idents, *body, inner);
            }
        }
        Node::BlockStatement { body } => {
            let inner = tree.push(ScopeKind::Block, Some(scope), id);
            for stmt in body {
                visit(ast, tree, decl_idents, *stmt, inner);
            }
        }
        Node::ForStatement { .. }
        | Node::ForInStatement { .. }
        | Node::ForOfStatement { .. }
        | Node::SwitchStatement { .. } => {
            let inner = tree.push(ScopeKind::Block, Some(scope), id);
            for child in ast.children(id) {
                visit(ast, tree, decl_idents, child, inner);
            }
        }
        Node::CatchClause { param, body } => {
            let inner = tree.push(ScopeKind::Block, Some(scope), id);
            if let Some(param) = param {
                if let Some(n) = ast.ident_name(*param) {
                    tree.declare(inner, n, *param);
                    decl_idents.push(*param);
                }
                tree.scope_of.insert(*param, inner);
            }
            visit_function_body(ast, tree, decl_idents, *body, inner);
        }
        Node::VariableDeclaration { kind, declarations } => {
            let hoisted = matches!(kind, DeclKind::Var);
            for declarator in declarations {
                tree.scope_of.insert(*declarator, scope);
                if let Node::VariableDeclarator { id: name, init } = ast.node(*declarator) {
                    if let Some(n) = ast.ident_name(*name) {
                        if hoisted {
                            tree.declare_hoisted(scope, n, *name);
                        } else {
                            tree.declare(scope, n, *name);
                        }
                        decl_idents.push(*name);
                    }
                    tree.scope_of.insert(*name, scope);
                    if let Some(init) = init {
                        visit(ast, tree, decl_idents, *init, scope);
                    }
                }
            }
        }
        Node::ClassDeclaration {
            id: name,
            superclass,
            body,
        } => {
            if let Some(n) = ast.ident_name(*name) {
                tree.declare(scope, n, *name);
                decl_idents.push(*name);
            }
            tree.scope_of.insert(*name, scope);
            if let Some(superclass) = superclass {
                visit(ast, tree, decl_idents, *superclass, scope);
            }
            for member in body {
                visit(ast, tree, decl_idents, *member, scope);
            }
        }
        _ => {
            for child in ast.children(id) {
                visit(ast, tree, decl_idents, child, scope);
            }
        }
    }
}

/// Walks a function body's statements directly in the function scope so
/// the body block does not open a second scope.
fn visit_function_body(
    ast: &Ast,
    tree: &mut ScopeTree,
    decl_idents: &mut Vec<NodeId>,
    body: NodeId,
    scope: ScopeId,
) {
    tree.scope_of.insert(body, scope);
    match ast.node(body) {
        Node::BlockStatement { body } => {
            for stmt in body {
                visit(ast, tree, decl_idents, *stmt, scope);
            }
        }
        _ => {
            for child in ast.children(body) {
                visit(ast, tree, decl_idents, child, scope);
            }
        }
    }
}

fn declare_params(
    ast: &Ast,
    tree: &mut ScopeTree,
    decl_idents: &mut Vec<NodeId>,
    params: &[NodeId],
    scope: ScopeId,
) {
    for param in params {
        if let Some(n) = ast.ident_name(*param) {
            tree.declare(scope, n, *param);
            decl_idents.push(*param);
        }
        tree.scope_of.insert(*param, scope);
    }
}
