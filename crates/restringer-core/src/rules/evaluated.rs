//! Unsafe rules: everything here consults the sandboxed evaluator and
//! therefore relies on runtime semantics. Every evaluation funnels
//! through BAD_VALUE checks; failures leave the candidate untouched.

use super::{import_fragment, ImportedFragment, RuleCtx};
use crate::arborist::Arborist;
use crate::cache::{fragment_key, CacheEntry};
use crate::context::{context_source, declaration_with_context, context_for_expression};
use crate::evaluator::{
    eval_in_vm, is_meaningful_replacement, to_string, value_to_node, Evaluated, Sandbox, Value,
};
use restringer_parser::ast::{LiteralValue, Node, NodeId, NodeKind, UnaryOp};
use restringer_parser::emit_expression;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Call targets that must never be resolved, either because they reach
/// the host or because their value is environment-dependent.
const CALLEE_DENY_LIST: &[&str] = &[
    "Function",
    "eval",
    "Array",
    "Object",
    "fetch",
    "XMLHttpRequest",
    "Promise",
    "console",
    "performance",
    "$",
];

/// Globals whose methods are never evaluated as local calls.
const GLOBAL_SKIP_LIST: &[&str] = &[
    "window",
    "this",
    "self",
    "document",
    "module",
    "$",
    "jQuery",
    "navigator",
    "typeof",
    "new",
    "Date",
    "Math",
    "Promise",
    "Error",
    "fetch",
    "XMLHttpRequest",
    "performance",
    "globalThis",
];

/// Properties that are either environment probes or receiver mutators;
/// resolving a call through one would be wrong or would lose the effect.
const PROPERTY_SKIP_LIST: &[&str] = &[
    "test",
    "exec",
    "match",
    "length",
    "freeze",
    "call",
    "apply",
    "create",
    "getTime",
    "now",
    "getMilliseconds",
    "push",
    "forEach",
    "pop",
    "insert",
    "add",
    "set",
    "delete",
    "shift",
    "unshift",
    "splice",
    "sort",
    "reverse",
    "fill",
    "copyWithin",
];

/// Built-in callables resolvable on literal arguments. `atob`/`btoa` are
/// handled natively without a sandbox round-trip.
const BUILTIN_ALLOW_LIST: &[&str] = &[
    "atob",
    "btoa",
    "escape",
    "unescape",
    "encodeURIComponent",
    "decodeURIComponent",
    "encodeURI",
    "decodeURI",
    "parseInt",
    "parseFloat",
    "String",
    "Number",
    "Boolean",
    "isNaN",
    "isFinite",
];

fn replace_with_value(arb: &mut Arborist, target: NodeId, value: &Value) -> bool {
    let Some(node) = value_to_node(value, arb.ast_mut()) else {
        return false;
    };
    arb.mark_node_replaced(target, node);
    true
}

/// Literal subtrees only: literals, arrays/templates of literals, unary
/// and `+` chains over those. The building blocks of minimal-alphabet
/// obfuscation and literal member math.
fn is_literal_subtree(arb: &Arborist, id: NodeId) -> bool {
    let mut literal = true;
    arb.ast().walk(id, &mut |_, node| match node {
        Node::Literal { .. }
        | Node::ArrayExpression { .. }
        | Node::UnaryExpression { .. }
        | Node::BinaryExpression { .. }
        | Node::TemplateLiteral { .. } => {}
        _ => literal = false,
    });
    literal
}

fn contains_this(arb: &Arborist, id: NodeId) -> bool {
    let mut found = false;
    arb.ast().walk(id, &mut |_, node| {
        if matches!(node, Node::ThisExpression) {
            found = true;
        }
    });
    found
}

/// Binary expressions whose operands are literals, resolved in the
/// sandbox. Handles the string/number coercions the safe folder refuses;
/// negative numeric results come back as a literal under unary minus.
pub fn evaluate_literal_binaries(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::BinaryExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::BinaryExpression { op, left, right } = arb.ast().node(id) else {
            continue;
        };
        if matches!(
            op,
            restringer_parser::ast::BinaryOp::In | restringer_parser::ast::BinaryOp::Instanceof
        ) {
            continue;
        }
        let (left, right) = (*left, *right);
        let literalish = |n: NodeId| {
            matches!(arb.ast().node(n), Node::Literal { value } if !matches!(value, LiteralValue::Regex { .. }))
        };
        if !literalish(left) || !literalish(right) {
            continue;
        }
        let fragment = emit_expression(arb.ast(), id);
        match eval_in_vm(&fragment, None) {
            Evaluated::Value(value) => {
                if replace_with_value(arb, id, &value) {
                    staged += 1;
                }
            }
            Evaluated::Bad => {}
        }
    }
    staged
}

/// `!x` over statically boolean material (literals, literal containers,
/// substitution-free templates, unbound `undefined`, nested unaries) is
/// evaluated down to `true`/`false`.
pub fn collapse_redundant_negations(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::UnaryExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::UnaryExpression {
            op: UnaryOp::Not,
            argument,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let argument = *argument;
        let evaluable = match arb.ast().node(argument) {
            Node::Literal { .. }
            | Node::ArrayExpression { .. }
            | Node::ObjectExpression { .. } => true,
            Node::TemplateLiteral { expressions, .. } => expressions.is_empty(),
            Node::Identifier { name } => {
                name == "undefined" && arb.indexes().decl_of(argument).is_none()
            }
            Node::UnaryExpression { .. } => is_literal_subtree(arb, argument),
            _ => false,
        };
        if !evaluable || contains_this(arb, argument) {
            continue;
        }
        let fragment = emit_expression(arb.ast(), id);
        // Object literals need expression context to parse.
        let fragment = format!("({fragment})");
        match eval_in_vm(&fragment, None) {
            Evaluated::Value(Value::Bool(b)) => {
                let replacement = arb.ast_mut().lit_bool(b);
                arb.mark_node_replaced(id, replacement);
                staged += 1;
            }
            _ => {}
        }
    }
    staged
}

/// JSFuck-style minimal-alphabet expressions: unary operators over
/// non-numeric literal material and `+` over two non-numeric sides.
pub fn evaluate_minimal_alphabet(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    let numeric = |arb: &Arborist, n: NodeId| {
        matches!(
            arb.ast().node(n),
            Node::Literal {
                value: LiteralValue::Number(_)
            }
        )
    };

    for id in arb.live_of_kind(NodeKind::UnaryExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::UnaryExpression { op, argument } = arb.ast().node(id) else {
            continue;
        };
        if !matches!(
            op,
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Not | UnaryOp::BitNot
        ) {
            continue;
        }
        let argument = *argument;
        if numeric(arb, argument) {
            continue;
        }
        if !is_literal_subtree(arb, argument) || contains_this(arb, argument) {
            continue;
        }
        let fragment = emit_expression(arb.ast(), id);
        if let Evaluated::Value(value) = eval_in_vm(&fragment, None) {
            if replace_with_value(arb, id, &value) {
                staged += 1;
            }
        }
    }

    for id in arb.live_of_kind(NodeKind::BinaryExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::BinaryExpression {
            op: restringer_parser::ast::BinaryOp::Add,
            left,
            right,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (left, right) = (*left, *right);
        if numeric(arb, left) || numeric(arb, right) {
            continue;
        }
        if !is_literal_subtree(arb, left) || !is_literal_subtree(arb, right) {
            continue;
        }
        if contains_this(arb, id) {
            continue;
        }
        // Two plain literals belong to the literal-binary rule.
        if arb.ast().literal(left).is_some() && arb.ast().literal(right).is_some() {
            continue;
        }
        let fragment = emit_expression(arb.ast(), id);
        if let Evaluated::Value(value) = eval_in_vm(&fragment, None) {
            if replace_with_value(arb, id, &value) {
                staged += 1;
            }
        }
    }
    staged
}

/// Member access on literal receivers: `'abc'[0]`, `[1, 2, 3][1]`,
/// `'hi'.length`. Skipped when the result is called or updated.
pub fn evaluate_literal_members(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::MemberExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::MemberExpression {
            object,
            property,
            computed,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (object, property, computed) = (*object, *property, *computed);
        let object_ok = match arb.ast().node(object) {
            Node::Literal { value } => !matches!(value, LiteralValue::Regex { .. }),
            Node::ArrayExpression { elements } => elements
                .iter()
                .all(|e| e.is_some_and(|e| arb.ast().literal(e).is_some())),
            _ => false,
        };
        if !object_ok {
            continue;
        }
        let property_ok = if computed {
            arb.ast().literal(property).is_some()
        } else {
            arb.ast().ident_name(property) == Some("length")
        };
        if !property_ok {
            continue;
        }
        // Not as a callee, not under ++/--, not written.
        if let Some(link) = arb.indexes().parent_link(id) {
            match arb.ast().node(link.parent) {
                Node::CallExpression { callee, .. } if *callee == id => continue,
                Node::UpdateExpression { .. } => continue,
                Node::AssignmentExpression { left, .. } if *left == id => continue,
                _ => {}
            }
        }
        let fragment = format!("({})", emit_expression(arb.ast(), id));
        if let Evaluated::Value(value) = eval_in_vm(&fragment, None) {
            if !is_meaningful_replacement(&value) {
                continue;
            }
            if replace_with_value(arb, id, &value) {
                staged += 1;
            }
        }
    }
    staged
}

/// Calls to allow-listed builtins with literal arguments. `atob`/`btoa`
/// bypass the sandbox; the deny list is checked explicitly and never
/// evaluated.
pub fn evaluate_builtin_calls(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(id) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());

        let callee_name = match arb.ast().node(callee) {
            Node::Identifier { name } => {
                if arb.indexes().decl_of(callee).is_some() {
                    continue;
                }
                name.clone()
            }
            // `String.fromCharCode(…)`, `Math.floor(…)`.
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } => {
                let Some(ns) = arb.ast().ident_name(*object) else {
                    continue;
                };
                let Some(method) = arb.ast().ident_name(*property) else {
                    continue;
                };
                if arb.indexes().decl_of(*object).is_some() {
                    continue;
                }
                if CALLEE_DENY_LIST.contains(&ns) {
                    continue;
                }
                if !matches!(ns, "String" | "Math" | "JSON" | "Number") {
                    continue;
                }
                format!("{ns}.{method}")
            }
            _ => continue,
        };
        if CALLEE_DENY_LIST.contains(&callee_name.as_str()) {
            continue;
        }
        if !callee_name.contains('.') && !BUILTIN_ALLOW_LIST.contains(&callee_name.as_str()) {
            continue;
        }
        if !arguments.iter().all(|a| {
            matches!(arb.ast().node(*a), Node::Literal { value } if !matches!(value, LiteralValue::Regex { .. }))
        }) {
            continue;
        }

        // Known-safe implementations skip the sandbox entirely.
        if callee_name == "atob" || callee_name == "btoa" {
            if arguments.len() != 1 {
                continue;
            }
            let Some(LiteralValue::String(input)) = arb.ast().literal(arguments[0]).cloned()
            else {
                continue;
            };
            let decoded = if callee_name == "atob" {
                crate::evaluator::atob_decode(&input)
            } else {
                crate::evaluator::btoa_encode(&input)
            };
            let Some(decoded) = decoded else { continue };
            let replacement = arb.ast_mut().lit_string(decoded);
            arb.mark_node_replaced(id, replacement);
            staged += 1;
            continue;
        }

        let fragment = emit_expression(arb.ast(), id);
        if let Evaluated::Value(value) = eval_in_vm(&fragment, None) {
            if replace_with_value(arb, id, &value) {
                staged += 1;
            }
        }
    }
    staged
}

/// Augmented-array wrappers: a function that overwrites itself and reads
/// from an externally declared array, permuted by a neighbouring IIFE.
/// The trio is loaded into one sandbox and every call site is resolved
/// through it.
pub fn evaluate_augmented_arrays(arb: &mut Arborist, ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    for declaration in arb.live_of_kind(NodeKind::FunctionDeclaration) {
        let Node::FunctionDeclaration { id: name, body, .. } = arb.ast().node(declaration) else {
            continue;
        };
        let (name, body) = (*name, *body);

        // Self-overwrite: an assignment whose target is the function's own
        // binding, inside its body.
        let self_overwrite = arb.indexes().refs_of(name).iter().any(|r| {
            arb.indexes().is_write_target(arb.ast(), *r)
                && arb.indexes().is_ancestor(declaration, *r)
        });
        if !self_overwrite {
            continue;
        }

        // The externally declared array the body reads from.
        let mut array_decl = None;
        arb.ast().walk(body, &mut |id, node| {
            if array_decl.is_some() {
                return;
            }
            if let Node::Identifier { .. } = node {
                let Some(decl) = arb.indexes().decl_of(id) else {
                    return;
                };
                if arb.indexes().is_ancestor(declaration, decl) {
                    return;
                }
                let Some(declarator) = arb.indexes().parent(decl) else {
                    return;
                };
                if let Node::VariableDeclarator {
                    init: Some(init), ..
                } = arb.ast().node(declarator)
                {
                    if arb.ast().kind(*init) == NodeKind::ArrayExpression {
                        array_decl = Some(decl);
                    }
                } else if let Node::FunctionDeclaration { body: fb, .. } =
                    arb.ast().node(declarator)
                {
                    // Function-to-array variant: the array lives behind a
                    // function returning it.
                    if matches!(arb.ast().node(*fb), Node::BlockStatement { body }
                        if body.len() == 1)
                    {
                        array_decl = Some(decl);
                    }
                }
            }
        });
        let Some(array_decl) = array_decl else { continue };

        let ast = arb.ast();
        let indexes = arb.indexes();
        let Some(array_stmt) = indexes.top_level_statement(ast, array_decl) else {
            continue;
        };
        let Some(fn_stmt) = indexes.top_level_statement(ast, declaration) else {
            continue;
        };

        // The permuting IIFE: a top-level call statement whose arguments
        // reference the array or the wrapper.
        let mut iife_stmt = None;
        for call in indexes.of_kind(NodeKind::CallExpression) {
            let Node::CallExpression { callee, .. } = ast.node(*call) else {
                continue;
            };
            if !matches!(
                ast.kind(*callee),
                NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
            ) {
                continue;
            }
            let mut touches = false;
            ast.walk(*call, &mut |id, node| {
                if let Node::Identifier { .. } = node {
                    if indexes.decl_of(id) == Some(array_decl) || indexes.decl_of(id) == Some(name)
                    {
                        touches = true;
                    }
                }
            });
            if !touches {
                continue;
            }
            let Some(stmt) = indexes.top_level_statement(ast, *call) else {
                continue;
            };
            if stmt != array_stmt && stmt != fn_stmt {
                iife_stmt = Some(stmt);
                break;
            }
        }
        let Some(iife_stmt) = iife_stmt else { continue };

        let prelude = context_source(arb, &[array_stmt, fn_stmt, iife_stmt]);
        let mut sandbox = Sandbox::new();
        if sandbox.run(&prelude).is_err() {
            debug!("augmented-array prelude failed to execute");
            continue;
        }

        for use_id in arb.indexes().refs_of(name).to_vec() {
            let Some(link) = arb.indexes().parent_link(use_id).copied() else {
                continue;
            };
            if link.key != "callee" || arb.ast().kind(link.parent) != NodeKind::CallExpression {
                continue;
            }
            let call = link.parent;
            if arb.is_stale(call) || arb.indexes().is_ancestor(declaration, call) {
                continue;
            }
            let Node::CallExpression { arguments, .. } = arb.ast().node(call) else {
                continue;
            };
            if !arguments
                .iter()
                .all(|a| arb.ast().literal(*a).is_some() || is_literal_subtree(arb, *a))
            {
                continue;
            }
            let fragment = emit_expression(arb.ast(), call);
            let key = fragment_key("evaluate-augmented-arrays", &fragment);
            match ctx.cache.get(&key) {
                Some(CacheEntry::Bad) => continue,
                Some(CacheEntry::Fragment(cached)) => {
                    if let Some(ImportedFragment::Expression(node)) =
                        import_fragment(arb, &cached.clone())
                    {
                        arb.mark_node_replaced(call, node);
                        staged += 1;
                    }
                    continue;
                }
                None => {}
            }
            match eval_in_vm(&fragment, Some(&mut sandbox)) {
                Evaluated::Value(value) if is_meaningful_replacement(&value) => {
                    if replace_with_value(arb, call, &value) {
                        if let Some(fragment) = to_string_fragment(&value) {
                            ctx.cache.insert(key, CacheEntry::Fragment(fragment));
                        }
                        staged += 1;
                    }
                }
                _ => {
                    ctx.cache.insert(key, CacheEntry::Bad);
                }
            }
        }
    }
    staged
}

/// Serialized source for a cached replacement value; only primitives
/// have a stable one-line spelling worth caching.
fn to_string_fragment(value: &Value) -> Option<String> {
    match value {
        Value::Str(_) => Some(restringer_parser::codegen::quote_string(&to_string(value))),
        Value::Number(_) | Value::Bool(_) | Value::Null => Some(to_string(value)),
        Value::Undefined => Some("undefined".to_string()),
        _ => None,
    }
}

/// Member chains rooted at locally declared object/array literals,
/// resolved in context. Empty results are rejected as meaningless.
pub fn evaluate_member_chains(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::MemberExpression) {
        if arb.is_stale(id) {
            continue;
        }
        // Only chain roots (not nested inside a larger member/call).
        if let Some(link) = arb.indexes().parent_link(id) {
            match arb.ast().node(link.parent) {
                Node::MemberExpression { object, .. } if *object == id => continue,
                Node::CallExpression { callee, .. } if *callee == id => continue,
                Node::AssignmentExpression { left, .. } if *left == id => continue,
                Node::UpdateExpression { .. } => continue,
                _ => {}
            }
        }

        // Chain must be identifiers + literal keys rooted at a local
        // object/array declaration.
        let mut base = id;
        let mut chain_ok = true;
        loop {
            match arb.ast().node(base) {
                Node::MemberExpression {
                    object, property, computed,
                } => {
                    let key_ok = if *computed {
                        arb.ast().literal(*property).is_some()
                    } else {
                        arb.ast().ident_name(*property).is_some()
                    };
                    if !key_ok {
                        chain_ok = false;
                        break;
                    }
                    base = *object;
                }
                Node::Identifier { .. } => break,
                _ => {
                    chain_ok = false;
                    break;
                }
            }
        }
        if !chain_ok {
            continue;
        }
        let Some(decl) = arb.indexes().decl_of(base) else {
            continue;
        };
        let Some(declarator) = arb.indexes().parent(decl) else {
            continue;
        };
        let Node::VariableDeclarator {
            init: Some(init), ..
        } = arb.ast().node(declarator)
        else {
            continue;
        };
        if !matches!(
            arb.ast().kind(*init),
            NodeKind::ObjectExpression | NodeKind::ArrayExpression
        ) {
            continue;
        }
        if arb.indexes().references_modified(arb.ast(), decl) {
            continue;
        }

        let statements = declaration_with_context(arb, decl, false);
        if statements.is_empty() {
            continue;
        }
        let prelude = context_source(arb, &statements);
        let mut sandbox = Sandbox::new();
        if sandbox.run(&prelude).is_err() {
            continue;
        }
        let fragment = emit_expression(arb.ast(), id);
        if let Evaluated::Value(value) = eval_in_vm(&fragment, Some(&mut sandbox)) {
            if !is_meaningful_replacement(&value) {
                continue;
            }
            if replace_with_value(arb, id, &value) {
                staged += 1;
            }
        }
    }
    staged
}

/// `X.prototype.m = fn` + `recv.m(args)` → the call is evaluated in a
/// sandbox holding the injection and the receiver's declaration.
pub fn evaluate_prototype_calls(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    // Collect injected prototype method names → assignment statement.
    let mut injected: FxHashMap<String, NodeId> = FxHashMap::default();
    for assignment in arb.indexes().of_kind(NodeKind::AssignmentExpression).to_vec() {
        let Node::AssignmentExpression { left, .. } = arb.ast().node(assignment) else {
            continue;
        };
        let Node::MemberExpression {
            object, property, ..
        } = arb.ast().node(*left)
        else {
            continue;
        };
        let Node::MemberExpression {
            property: proto_key,
            ..
        } = arb.ast().node(*object)
        else {
            continue;
        };
        if arb.ast().ident_name(*proto_key) != Some("prototype") {
            continue;
        }
        let Some(method) = arb.ast().ident_name(*property) else {
            continue;
        };
        let Some(stmt) = arb.indexes().top_level_statement(arb.ast(), assignment) else {
            continue;
        };
        injected.insert(method.to_string(), stmt);
    }
    if injected.is_empty() {
        return 0;
    }

    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());
        let Node::MemberExpression {
            object, property, computed: false,
        } = arb.ast().node(callee)
        else {
            continue;
        };
        let (object, property) = (*object, *property);
        let Some(method) = arb.ast().ident_name(property).map(str::to_string) else {
            continue;
        };
        let Some(assignment_stmt) = injected.get(&method).copied() else {
            continue;
        };
        if !arguments.iter().all(|a| arb.ast().literal(*a).is_some()) {
            continue;
        }
        let Node::Identifier { .. } = arb.ast().node(object) else {
            continue;
        };
        let Some(recv_decl) = arb.indexes().decl_of(object) else {
            continue;
        };

        let mut statements = declaration_with_context(arb, recv_decl, false);
        for stmt in context_for_expression(arb, assignment_stmt) {
            if !statements.contains(&stmt) {
                statements.push(stmt);
            }
        }
        if !statements.contains(&assignment_stmt) {
            statements.push(assignment_stmt);
        }
        statements.sort_by_key(|s| arb.ast().span(*s).start);

        let prelude = context_source(arb, &statements);
        let mut sandbox = Sandbox::new();
        if sandbox.run(&prelude).is_err() {
            continue;
        }
        let fragment = emit_expression(arb.ast(), call);
        if let Evaluated::Value(value) = eval_in_vm(&fragment, Some(&mut sandbox)) {
            if !is_meaningful_replacement(&value) {
                continue;
            }
            if replace_with_value(arb, call, &value) {
                staged += 1;
            }
        }
    }
    staged
}

/// `eval(expr)` with a non-literal argument: the argument is evaluated in
/// context; a string result is parsed (with a light newline-insertion
/// retry) and spliced, anything else is substituted directly.
pub fn evaluate_eval_arguments(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        if arguments.len() != 1 {
            continue;
        }
        let (callee, argument) = (*callee, arguments[0]);
        if arb.ast().ident_name(callee) != Some("eval")
            || arb.indexes().decl_of(callee).is_some()
        {
            continue;
        }
        // Literal payloads belong to the safe rule.
        if arb.ast().literal(argument).is_some() {
            continue;
        }
        let statements = context_for_expression(arb, argument);
        let prelude = context_source(arb, &statements);
        let mut sandbox = Sandbox::new();
        if !prelude.is_empty() && sandbox.run(&prelude).is_err() {
            continue;
        }
        let fragment = emit_expression(arb.ast(), argument);
        let value = match eval_in_vm(&fragment, Some(&mut sandbox)) {
            Evaluated::Value(v) => v,
            Evaluated::Bad => continue,
        };
        match &value {
            Value::Str(code) => {
                let code = code.as_ref().clone();
                let parsed = import_fragment(arb, &code)
                    .or_else(|| import_fragment(arb, &loosen_packed_source(&code)));
                match parsed {
                    Some(ImportedFragment::Expression(expr)) => {
                        arb.mark_node_replaced(call, expr);
                        staged += 1;
                    }
                    Some(ImportedFragment::Statements(stmts)) => {
                        let Some(link) = arb.indexes().parent_link(call).copied() else {
                            continue;
                        };
                        if arb.ast().kind(link.parent) == NodeKind::ExpressionStatement
                            && super::splice_statement(arb, &mut spliced, link.parent, stmts)
                        {
                            staged += 1;
                        }
                    }
                    None => {
                        // Keep the recovered string itself.
                        let replacement = arb.ast_mut().lit_string(code);
                        arb.mark_node_replaced(argument, replacement);
                        staged += 1;
                    }
                }
            }
            other => {
                if is_meaningful_replacement(other) && replace_with_value(arb, call, other) {
                    staged += 1;
                }
            }
        }
    }
    staged
}

/// Retry helper for packed payloads that rely on ASI: inserts newlines
/// after `)` and `}` when not followed by `/`.
fn loosen_packed_source(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len() + 16);
    for (i, c) in chars.iter().enumerate() {
        out.push(*c);
        if matches!(c, ')' | '}') && chars.get(i + 1).copied() != Some('/') {
            out.push('\n');
        }
    }
    out
}

/// Local wrapper calls resolved through the context extractor. The most
/// frequently called wrappers are attempted first; results (and
/// failures) are cached under `callee-name:fragment`.
pub fn evaluate_local_calls(arb: &mut Arborist, ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    // Gather candidates with their callee declaration.
    struct Candidate {
        call: NodeId,
        decl: NodeId,
        name: String,
    }
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut frequency: FxHashMap<NodeId, usize> = FxHashMap::default();

    for call in arb.live_of_kind(NodeKind::CallExpression) {
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());
        if contains_this(arb, call) {
            continue;
        }
        let (decl, name) = match arb.ast().node(callee) {
            Node::Identifier { name } => {
                if GLOBAL_SKIP_LIST.contains(&name.as_str())
                    || CALLEE_DENY_LIST.contains(&name.as_str())
                {
                    continue;
                }
                match arb.indexes().decl_of(callee) {
                    Some(decl) => (decl, name.clone()),
                    None => continue,
                }
            }
            Node::MemberExpression {
                object,
                property,
                computed: false,
            } => {
                let Some(base) = arb.ast().ident_name(*object) else {
                    continue;
                };
                let Some(prop) = arb.ast().ident_name(*property) else {
                    continue;
                };
                if GLOBAL_SKIP_LIST.contains(&base) || PROPERTY_SKIP_LIST.contains(&prop) {
                    continue;
                }
                match arb.indexes().decl_of(*object) {
                    Some(decl) => (decl, format!("{base}.{prop}")),
                    None => continue,
                }
            }
            _ => continue,
        };
        // Arguments must be inert.
        if !arguments
            .iter()
            .all(|a| is_literal_subtree(arb, *a) && !contains_this(arb, *a))
        {
            continue;
        }
        // The callee must not be called from inside its own declaration
        // statement (self-recursion resolves nothing).
        if let Some(decl_stmt) = arb.indexes().top_level_statement(arb.ast(), decl) {
            if let Some(call_stmt) = arb.indexes().top_level_statement(arb.ast(), call) {
                if decl_stmt == call_stmt {
                    continue;
                }
            }
        }
        *frequency.entry(decl).or_default() += 1;
        candidates.push(Candidate { call, decl, name });
    }

    // Most frequently used wrappers first: those are the string decoders.
    candidates.sort_by(|a, b| {
        frequency[&b.decl]
            .cmp(&frequency[&a.decl])
            .then_with(|| arb.ast().span(a.call).start.cmp(&arb.ast().span(b.call).start))
    });

    let mut sandboxes: FxHashMap<NodeId, Option<Sandbox>> = FxHashMap::default();

    for candidate in candidates {
        if arb.is_stale(candidate.call) {
            continue;
        }
        let fragment = emit_expression(arb.ast(), candidate.call);
        let key = fragment_key(&format!("resolve-local-calls-{}", candidate.name), &fragment);
        match ctx.cache.get(&key) {
            Some(CacheEntry::Bad) => continue,
            Some(CacheEntry::Fragment(cached)) => {
                if let Some(ImportedFragment::Expression(node)) =
                    import_fragment(arb, &cached.clone())
                {
                    arb.mark_node_replaced(candidate.call, node);
                    staged += 1;
                }
                continue;
            }
            None => {}
        }

        // Anti-debugging trap: resolving `.toString` into function source.
        let is_to_string = candidate.name.ends_with(".toString");

        let sandbox = sandboxes.entry(candidate.decl).or_insert_with(|| {
            let statements = declaration_with_context(arb, candidate.decl, false);
            if statements.is_empty() {
                return None;
            }
            let prelude = context_source(arb, &statements);
            let mut sandbox = Sandbox::new();
            match sandbox.run(&prelude) {
                Ok(_) => Some(sandbox),
                Err(err) => {
                    debug!(%err, "local-call context failed to execute");
                    None
                }
            }
        });
        let Some(sandbox) = sandbox else { continue };

        match eval_in_vm(&fragment, Some(sandbox)) {
            Evaluated::Value(value) => {
                if !is_meaningful_replacement(&value) {
                    ctx.cache.insert(key, CacheEntry::Bad);
                    continue;
                }
                if is_to_string {
                    if let Value::Str(s) = &value {
                        if s.starts_with("function") {
                            ctx.cache.insert(key, CacheEntry::Bad);
                            continue;
                        }
                    }
                }
                if replace_with_value(arb, candidate.call, &value) {
                    if let Some(fragment) = to_string_fragment(&value) {
                        ctx.cache.insert(key, CacheEntry::Fragment(fragment));
                    }
                    staged += 1;
                } else {
                    ctx.cache.insert(key, CacheEntry::Bad);
                }
            }
            Evaluated::Bad => {
                ctx.cache.insert(key, CacheEntry::Bad);
            }
        }
    }
    staged
}
