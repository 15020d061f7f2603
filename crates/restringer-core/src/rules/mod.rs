//! The rewrite-rule library.
//!
//! Every rule is a plain function `fn(&mut Arborist, &mut RuleCtx) ->
//! usize` returning the number of edits it staged; the driver commits
//! after each rule. Rules match against the pre-commit tree only, skip
//! candidates made stale by earlier staged edits, and stage structural
//! clones whenever one source construct lands in several places.
//!
//! `safe_rules()` are pure AST algebra; `unsafe_rules()` consult the
//! sandboxed evaluator and are the only rules that can bake runtime
//! behavior into the output.

pub mod control_flow;
pub mod evaluated;
pub mod functions;
pub mod literals;
pub mod variables;

use crate::arborist::Arborist;
use crate::cache::Cache;
use restringer_parser::ast::{Node, NodeId, PropertyKind};
use restringer_parser::Span;

/// Shared per-run state handed to every rule invocation.
#[derive(Debug, Default)]
pub struct RuleCtx {
    pub cache: Cache,
}

impl RuleCtx {
    pub fn new() -> Self {
        RuleCtx::default()
    }
}

pub type RuleFn = fn(&mut Arborist, &mut RuleCtx) -> usize;

/// A registry entry; the orchestrator owns caller-replaceable lists of
/// these.
#[derive(Clone, Copy)]
pub struct NamedRule {
    pub name: &'static str,
    pub run: RuleFn,
}

impl std::fmt::Debug for NamedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NamedRule({})", self.name)
    }
}

macro_rules! rule {
    ($name:literal, $path:path) => {
        NamedRule {
            name: $name,
            run: $path,
        }
    };
}

/// Default safe rule order. String/literal algebra first, then variable
/// flow, then function unwrapping, then control-flow cleanup; earlier
/// rules feed candidates to later ones within the same driver pass.
pub fn safe_rules() -> Vec<NamedRule> {
    vec![
        rule!("fold-binary-literals", literals::fold_binary_literals),
        rule!("fold-template-literals", literals::fold_template_literals),
        rule!("normalize-computed-members", literals::normalize_computed_members),
        rule!("decode-atob-calls", literals::decode_atob_calls),
        rule!("propagate-constant-variables", variables::propagate_constant_variables),
        rule!("propagate-fixed-assignments", variables::propagate_fixed_assignments),
        rule!("replace-proxy-variables", variables::replace_proxy_variables),
        rule!("replace-proxy-member-aliases", variables::replace_proxy_member_aliases),
        rule!(
            "resolve-direct-property-assignments",
            variables::resolve_direct_property_assignments
        ),
        rule!("resolve-array-index-reads", variables::resolve_array_index_reads),
        rule!("replace-value-shell-functions", functions::replace_value_shell_functions),
        rule!("replace-value-shell-iifes", functions::replace_value_shell_iifes),
        rule!(
            "unwrap-calls-returning-identifiers",
            functions::unwrap_calls_returning_identifiers
        ),
        rule!("inline-operator-wrappers", functions::inline_operator_wrappers),
        rule!("replace-call-forwarders", functions::replace_call_forwarders),
        rule!("replace-apply-shells", functions::replace_apply_shells),
        rule!("unwrap-iife-initializers", functions::unwrap_iife_initializers),
        rule!(
            "resolve-function-constructor-calls",
            functions::resolve_function_constructor_calls
        ),
        rule!("parse-new-function-literals", functions::parse_new_function_literals),
        rule!("unfold-eval-literals", functions::unfold_eval_literals),
        rule!("simplify-call-and-apply", control_flow::simplify_call_and_apply),
        rule!("resolve-literal-conditionals", control_flow::resolve_literal_conditionals),
        rule!("reduce-literal-logical-tests", control_flow::reduce_literal_logical_tests),
        rule!("resolve-literal-if-statements", control_flow::resolve_literal_if_statements),
        rule!("simplify-empty-if-branches", control_flow::simplify_empty_if_branches),
        rule!(
            "rewrite-logical-expression-statements",
            control_flow::rewrite_logical_expression_statements
        ),
        rule!("linearize-constant-switches", control_flow::linearize_constant_switches),
        rule!("split-sequence-statements", control_flow::split_sequence_statements),
        rule!("hoist-leading-sequences", control_flow::hoist_leading_sequences),
        rule!("split-variable-declarators", control_flow::split_variable_declarators),
        rule!("flatten-redundant-blocks", control_flow::flatten_redundant_blocks),
        rule!("normalize-empty-statements", control_flow::normalize_empty_statements),
        rule!("remove-dead-declarations", variables::remove_dead_declarations),
    ]
}

/// Default unsafe rule order: cheap literal evaluations first, wrapper
/// resolution last (it is the expensive one and benefits from the tree
/// the earlier rules already cleaned).
pub fn unsafe_rules() -> Vec<NamedRule> {
    vec![
        rule!("evaluate-literal-binaries", evaluated::evaluate_literal_binaries),
        rule!("collapse-redundant-negations", evaluated::collapse_redundant_negations),
        rule!("evaluate-minimal-alphabet", evaluated::evaluate_minimal_alphabet),
        rule!("evaluate-literal-members", evaluated::evaluate_literal_members),
        rule!("evaluate-builtin-calls", evaluated::evaluate_builtin_calls),
        rule!("evaluate-augmented-arrays", evaluated::evaluate_augmented_arrays),
        rule!("evaluate-member-chains", evaluated::evaluate_member_chains),
        rule!("evaluate-prototype-calls", evaluated::evaluate_prototype_calls),
        rule!("evaluate-eval-arguments", evaluated::evaluate_eval_arguments),
        rule!("evaluate-local-calls", evaluated::evaluate_local_calls),
    ]
}

// ----------------------------------------------------------------------
// Helpers shared across rule modules
// ----------------------------------------------------------------------

/// Whether evaluating this subtree can have observable side effects.
/// Conservative: anything that calls, constructs, writes or touches
/// `this` counts as effectful.
pub(crate) fn is_side_effect_free(arb: &Arborist, id: NodeId) -> bool {
    let mut free = true;
    arb.ast().walk(id, &mut |_, node| match node {
        Node::CallExpression { .. }
        | Node::NewExpression { .. }
        | Node::AssignmentExpression { .. }
        | Node::UpdateExpression { .. }
        | Node::ThisExpression => free = false,
        Node::UnaryExpression { op, .. } if *op == restringer_parser::ast::UnaryOp::Delete => {
            free = false
        }
        _ => {}
    });
    free
}

/// Statically decidable JS truthiness of an expression node: literals,
/// array/object/function literals, substitution-free templates.
pub(crate) fn static_truthiness(arb: &Arborist, id: NodeId) -> Option<bool> {
    match arb.ast().node(id) {
        Node::Literal { value } => Some(value.is_truthy()),
        Node::ArrayExpression { .. }
        | Node::ObjectExpression { .. }
        | Node::FunctionExpression { .. }
        | Node::ArrowFunctionExpression { .. } => Some(true),
        Node::TemplateLiteral {
            quasis,
            expressions,
        } => {
            if expressions.is_empty() {
                Some(quasis.iter().any(|q| !q.cooked.is_empty()))
            } else {
                None
            }
        }
        Node::Identifier { name } if name == "undefined" => {
            match arb.indexes().decl_of(id) {
                None => Some(false),
                Some(_) => None,
            }
        }
        Node::UnaryExpression { op, argument } => {
            let inner = static_truthiness(arb, *argument)?;
            match op {
                restringer_parser::ast::UnaryOp::Not => Some(!inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Whether the subtree references anything declared inside `function_node`
/// (or uses `this`/`arguments`), which would break when lifted out of it.
pub(crate) fn captures_function_locals(arb: &Arborist, subtree: NodeId, function_node: NodeId) -> bool {
    let ast = arb.ast();
    let indexes = arb.indexes();
    let mut captured = false;
    ast.walk(subtree, &mut |id, node| match node {
        Node::ThisExpression => captured = true,
        Node::Identifier { name } => {
            if name == "arguments" {
                captured = true;
            }
            if let Some(decl) = indexes.decl_of(id) {
                if decl == function_node || indexes.is_ancestor(function_node, decl) {
                    captured = true;
                }
            }
        }
        _ => {}
    });
    captured
}

/// Replaces a bound identifier use with a freshly built node, rebuilding
/// the surrounding shorthand property when needed so `{ a }` becomes
/// `{ a: <replacement> }` rather than emitting the replacement as a key.
pub(crate) fn replace_identifier_use(arb: &mut Arborist, use_id: NodeId, replacement: NodeId) {
    let shorthand_property = arb.indexes().parent_link(use_id).and_then(|link| {
        match arb.ast().node(link.parent) {
            Node::Property {
                key,
                shorthand: true,
                kind: PropertyKind::Init,
                ..
            } if link.key == "value" => Some((link.parent, *key)),
            _ => None,
        }
    });
    match shorthand_property {
        Some((property, key)) => {
            let key = arb.ast_mut().clone_subtree(key);
            let rebuilt = arb.ast_mut().alloc(
                Node::Property {
                    key,
                    value: replacement,
                    kind: PropertyKind::Init,
                    computed: false,
                    shorthand: false,
                },
                Span::SYNTHETIC,
            );
            arb.mark_node_replaced(property, rebuilt);
        }
        None => arb.mark_node_replaced(use_id, replacement),
    }
}

/// Splices `replacements` in place of `stmt` inside its statement list by
/// rebuilding the parent node. Returns `false` when the parent is not a
/// statement list or was already rebuilt this pass.
pub(crate) fn splice_statement(
    arb: &mut Arborist,
    spliced_parents: &mut rustc_hash::FxHashSet<NodeId>,
    stmt: NodeId,
    replacements: Vec<NodeId>,
) -> bool {
    let Some(link) = arb.indexes().parent_link(stmt).copied() else {
        return false;
    };
    if spliced_parents.contains(&link.parent) {
        return false;
    }
    let rebuilt = match arb.ast().node(link.parent) {
        Node::Program { body } => {
            let body = splice_vec(body, stmt, &replacements);
            Node::Program { body }
        }
        Node::BlockStatement { body } => {
            let body = splice_vec(body, stmt, &replacements);
            Node::BlockStatement { body }
        }
        Node::SwitchCase { test, consequent } => {
            let consequent = splice_vec(consequent, stmt, &replacements);
            Node::SwitchCase {
                test: *test,
                consequent,
            }
        }
        _ => return false,
    };
    let new_parent = arb.ast_mut().alloc(rebuilt, Span::SYNTHETIC);
    arb.mark_node_replaced(link.parent, new_parent);
    spliced_parents.insert(link.parent);
    true
}

fn splice_vec(body: &[NodeId], stmt: NodeId, replacements: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(body.len() + replacements.len());
    for id in body {
        if *id == stmt {
            out.extend_from_slice(replacements);
        } else {
            out.push(*id);
        }
    }
    out
}

/// Parses an emitted fragment and imports it into the arborist's arena:
/// a single-expression program yields the expression, anything else the
/// list of statements.
pub(crate) enum ImportedFragment {
    Expression(NodeId),
    Statements(Vec<NodeId>),
}

pub(crate) fn import_fragment(arb: &mut Arborist, source: &str) -> Option<ImportedFragment> {
    let parsed = restringer_parser::parse_program(source).ok()?;
    let Node::Program { body } = parsed.node(parsed.root()) else {
        return None;
    };
    let body = body.clone();
    if body.len() == 1 {
        if let Node::ExpressionStatement { expression } = parsed.node(body[0]) {
            let imported = arb.ast_mut().import_subtree(&parsed, *expression);
            return Some(ImportedFragment::Expression(imported));
        }
    }
    let imported: Vec<NodeId> = body
        .iter()
        .map(|s| arb.ast_mut().import_subtree(&parsed, *s))
        .collect();
    Some(ImportedFragment::Statements(imported))
}
