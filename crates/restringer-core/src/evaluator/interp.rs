//! Tree-walking interpreter executing sandbox fragments. Every loop body
//! and call passes through `tick()`, which enforces the mandatory wall
//! clock and step budgets; string/array growth is capped as a stand-in
//! for a memory budget.

use super::builtins;
use super::value::{
    loose_eq, strict_eq, to_i32, to_number, to_primitive, to_string, to_u32, BoundMethod, Env,
    EnvRef, FunctionValue, ObjectData, Value,
};
use restringer_parser::ast::{
    AssignOp, Ast, BinaryOp, DeclKind, LiteralValue, LogicalOp, Node, NodeId, UnaryOp, UpdateOp,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Limits {
    pub timeout: Duration,
    pub max_steps: u64,
    pub max_string: usize,
    pub max_array: usize,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            timeout: Duration::from_secs(10),
            max_steps: 4_000_000,
            max_string: 16 * 1024 * 1024,
            max_array: 1 << 20,
            max_call_depth: 256,
        }
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("fragment parse error: {0}")]
    Parse(String),
    #[error("evaluation timed out")]
    Timeout,
    #[error("step budget exceeded")]
    StepLimit,
    #[error("memory budget exceeded")]
    MemoryLimit,
    #[error("uncaught: {0:?}")]
    Thrown(Value),
    #[error("{0} is not defined")]
    Reference(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type EResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Errors a `try`/`catch` can observe, converted to the value the
    /// catch parameter binds.
    fn catchable(&self) -> Option<Value> {
        match self {
            EvalError::Thrown(v) => Some(v.clone()),
            EvalError::Reference(name) => Some(error_object("ReferenceError", name)),
            EvalError::Type(msg) => Some(error_object("TypeError", msg)),
            _ => None,
        }
    }
}

pub(crate) fn error_object(name: &str, message: &str) -> Value {
    let data = Rc::new(RefCell::new(ObjectData::default()));
    data.borrow_mut().set("name", Value::str(name));
    data.borrow_mut().set("message", Value::str(message));
    Value::Object(data)
}

#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

pub struct Interp {
    pub global: EnvRef,
    limits: Limits,
    deadline: Instant,
    steps: u64,
    depth: usize,
    completion: Value,
}

impl Interp {
    pub fn new(limits: Limits) -> Self {
        let global = Env::root();
        builtins::install_globals(&global);
        let deadline = Instant::now() + limits.timeout;
        Interp {
            global,
            limits,
            deadline,
            steps: 0,
            depth: 0,
            completion: Value::Undefined,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Restarts the wall-clock budget; called once per `Sandbox::run`.
    pub fn reset_budget(&mut self) {
        self.deadline = Instant::now() + self.limits.timeout;
        self.steps = 0;
    }

    fn tick(&mut self) -> EResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::StepLimit);
        }
        if self.steps & 0x3ff == 0 && Instant::now() > self.deadline {
            return Err(EvalError::Timeout);
        }
        Ok(())
    }

    pub(crate) fn check_string(&self, len: usize) -> EResult<()> {
        if len > self.limits.max_string {
            return Err(EvalError::MemoryLimit);
        }
        Ok(())
    }

    pub(crate) fn check_array(&self, len: usize) -> EResult<()> {
        if len > self.limits.max_array {
            return Err(EvalError::MemoryLimit);
        }
        Ok(())
    }

    /// Runs a parsed program in the global environment, returning the
    /// completion value (the value of the last expression statement).
    pub fn run(&mut self, ast: &Rc<Ast>) -> EResult<Value> {
        let Node::Program { body } = ast.node(ast.root()) else {
            return Err(EvalError::Parse("missing program root".into()));
        };
        let body = body.clone();
        let env = self.global.clone();
        self.hoist(ast, &body, &env, true);
        self.completion = Value::Undefined;
        for stmt in &body {
            match self.eval_stmt(ast, *stmt, &env)? {
                Flow::Normal => {}
                Flow::Return(v) => return Ok(v),
                Flow::Break(_) | Flow::Continue(_) => break,
            }
        }
        Ok(self.completion.clone())
    }

    // ------------------------------------------------------------------
    // Hoisting
    // ------------------------------------------------------------------

    /// Declares function declarations (and, when `include_vars`, `var`
    /// names as `undefined`) ahead of execution. Does not descend into
    /// nested functions.
    fn hoist(&mut self, ast: &Rc<Ast>, stmts: &[NodeId], env: &EnvRef, include_vars: bool) {
        for stmt in stmts {
            self.hoist_one(ast, *stmt, env, include_vars);
        }
    }

    fn hoist_one(&mut self, ast: &Rc<Ast>, id: NodeId, env: &EnvRef, include_vars: bool) {
        match ast.node(id) {
            Node::FunctionDeclaration { id: name, .. } => {
                if let Some(n) = ast.ident_name(*name) {
                    let f = self.make_function(ast, id, env);
                    Env::define(env, n, f);
                }
            }
            Node::VariableDeclaration {
                kind: DeclKind::Var,
                declarations,
            } if include_vars => {
                for d in declarations {
                    if let Node::VariableDeclarator { id: name, .. } = ast.node(*d) {
                        if let Some(n) = ast.ident_name(*name) {
                            if Env::lookup(env, n).is_none() {
                                Env::define(env, n, Value::Undefined);
                            }
                        }
                    }
                }
            }
            Node::BlockStatement { body } => self.hoist(ast, body, env, include_vars),
            Node::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_one(ast, *consequent, env, include_vars);
                if let Some(alt) = alternate {
                    self.hoist_one(ast, *alt, env, include_vars);
                }
            }
            Node::ForStatement { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_one(ast, *init, env, include_vars);
                }
                self.hoist_one(ast, *body, env, include_vars);
            }
            Node::ForInStatement { left, body, .. } | Node::ForOfStatement { left, body, .. } => {
                self.hoist_one(ast, *left, env, include_vars);
                self.hoist_one(ast, *body, env, include_vars);
            }
            Node::WhileStatement { body, .. }
            | Node::DoWhileStatement { body, .. }
            | Node::LabeledStatement { body, .. } => self.hoist_one(ast, *body, env, include_vars),
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_one(ast, *block, env, include_vars);
                if let Some(handler) = handler {
                    if let Node::CatchClause { body, .. } = ast.node(*handler) {
                        self.hoist_one(ast, *body, env, include_vars);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.hoist_one(ast, *finalizer, env, include_vars);
                }
            }
            Node::SwitchStatement { cases, .. } => {
                for case in cases {
                    if let Node::SwitchCase { consequent, .. } = ast.node(*case) {
                        self.hoist(ast, consequent, env, include_vars);
                    }
                }
            }
            _ => {}
        }
    }

    fn make_function(&self, ast: &Rc<Ast>, id: NodeId, env: &EnvRef) -> Value {
        let (name, params, body, expression_body, is_arrow) = match ast.node(id) {
            Node::FunctionDeclaration { id: name, params, body } => (
                ast.ident_name(*name).map(str::to_string),
                params.clone(),
                *body,
                false,
                false,
            ),
            Node::FunctionExpression { id: name, params, body } => (
                name.as_ref()
                    .and_then(|n| ast.ident_name(*n).map(str::to_string)),
                params.clone(),
                *body,
                false,
                false,
            ),
            Node::ArrowFunctionExpression {
                params,
                body,
                expression,
            } => (None, params.clone(), *body, *expression, true),
            _ => return Value::Undefined,
        };
        let params = params
            .iter()
            .filter_map(|p| ast.ident_name(*p).map(str::to_string))
            .collect();
        Value::Function(Rc::new(FunctionValue {
            ast: ast.clone(),
            name,
            params,
            body,
            expression_body,
            is_arrow,
            env: env.clone(),
            prototype: RefCell::new(None),
            props: RefCell::new(ObjectData::default()),
        }))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn eval_stmt(&mut self, ast: &Rc<Ast>, id: NodeId, env: &EnvRef) -> EResult<Flow> {
        self.tick()?;
        match ast.node(id) {
            Node::ExpressionStatement { expression } => {
                let v = self.eval_expr(ast, *expression, env)?;
                self.completion = v;
                Ok(Flow::Normal)
            }
            Node::EmptyStatement | Node::DebuggerStatement | Node::FunctionDeclaration { .. } => {
                Ok(Flow::Normal)
            }
            Node::VariableDeclaration { kind, declarations } => {
                let hoisted = matches!(kind, DeclKind::Var);
                for d in declarations.clone() {
                    let Node::VariableDeclarator { id: name, init } = ast.node(d) else {
                        continue;
                    };
                    let (name, init) = (*name, *init);
                    let Some(n) = ast.ident_name(name).map(str::to_string) else {
                        continue;
                    };
                    let value = match init {
                        Some(init) => self.eval_expr(ast, init, env)?,
                        None => Value::Undefined,
                    };
                    if hoisted {
                        Env::assign(env, &n, value);
                    } else {
                        Env::define(env, &n, value);
                    }
                }
                Ok(Flow::Normal)
            }
            Node::BlockStatement { body } => {
                let body = body.clone();
                let child = Env::child(env);
                self.hoist(ast, &body, &child, false);
                self.eval_stmt_list(ast, &body, &child)
            }
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                if self.eval_expr(ast, test, env)?.is_truthy() {
                    self.eval_stmt(ast, consequent, env)
                } else if let Some(alt) = alternate {
                    self.eval_stmt(ast, alt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Node::WhileStatement { test, body } => {
                let (test, body) = (*test, *body);
                loop {
                    self.tick()?;
                    if !self.eval_expr(ast, test, env)?.is_truthy() {
                        break;
                    }
                    match self.eval_stmt(ast, body, env)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Node::DoWhileStatement { body, test } => {
                let (body, test) = (*body, *test);
                loop {
                    self.tick()?;
                    match self.eval_stmt(ast, body, env)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                    if !self.eval_expr(ast, test, env)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                let (init, test, update, body) = (*init, *test, *update, *body);
                let loop_env = Env::child(env);
                if let Some(init) = init {
                    if matches!(ast.node(init), Node::VariableDeclaration { .. }) {
                        self.eval_stmt(ast, init, &loop_env)?;
                    } else {
                        self.eval_expr(ast, init, &loop_env)?;
                    }
                }
                loop {
                    self.tick()?;
                    if let Some(test) = test {
                        if !self.eval_expr(ast, test, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    match self.eval_stmt(ast, body, &loop_env)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                    if let Some(update) = update {
                        self.eval_expr(ast, update, &loop_env)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Node::ForInStatement { left, right, body } => {
                let (left, right, body) = (*left, *right, *body);
                let value = self.eval_expr(ast, right, env)?;
                let keys: Vec<String> = match &value {
                    Value::Object(o) => o.borrow().keys(),
                    Value::Array(a) => (0..a.borrow().len()).map(|i| i.to_string()).collect(),
                    Value::Str(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                let loop_env = Env::child(env);
                for key in keys {
                    self.tick()?;
                    self.bind_for_target(ast, left, Value::str(key), &loop_env)?;
                    match self.eval_stmt(ast, body, &loop_env)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Node::ForOfStatement { left, right, body } => {
                let (left, right, body) = (*left, *right, *body);
                let value = self.eval_expr(ast, right, env)?;
                let items: Vec<Value> = match &value {
                    Value::Array(a) => a.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
                    _ => return Err(EvalError::Type("value is not iterable".into())),
                };
                let loop_env = Env::child(env);
                for item in items {
                    self.tick()?;
                    self.bind_for_target(ast, left, item, &loop_env)?;
                    match self.eval_stmt(ast, body, &loop_env)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => {
                let (discriminant, cases) = (*discriminant, cases.clone());
                let value = self.eval_expr(ast, discriminant, env)?;
                let switch_env = Env::child(env);
                let mut start = None;
                let mut default = None;
                for (i, case) in cases.iter().enumerate() {
                    let Node::SwitchCase { test, .. } = ast.node(*case) else {
                        continue;
                    };
                    match test {
                        Some(test) => {
                            let t = self.eval_expr(ast, *test, &switch_env)?;
                            if strict_eq(&t, &value) {
                                start = Some(i);
                                break;
                            }
                        }
                        None => default = Some(i),
                    }
                }
                let Some(start) = start.or(default) else {
                    return Ok(Flow::Normal);
                };
                for case in &cases[start..] {
                    let Node::SwitchCase { consequent, .. } = ast.node(*case) else {
                        continue;
                    };
                    match self.eval_stmt_list(ast, &consequent.clone(), &switch_env)? {
                        Flow::Break(None) => return Ok(Flow::Normal),
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Node::ReturnStatement { argument } => {
                let value = match argument {
                    Some(arg) => self.eval_expr(ast, *arg, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Node::BreakStatement { label } => Ok(Flow::Break(label.clone())),
            Node::ContinueStatement { label } => Ok(Flow::Continue(label.clone())),
            Node::LabeledStatement { label, body } => {
                let (label, body) = (label.clone(), *body);
                match self.eval_stmt(ast, body, env)? {
                    Flow::Break(Some(l)) | Flow::Continue(Some(l)) if l == label => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            Node::ThrowStatement { argument } => {
                let value = self.eval_expr(ast, *argument, env)?;
                Err(EvalError::Thrown(value))
            }
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let (block, handler, finalizer) = (*block, *handler, *finalizer);
                let mut result = self.eval_stmt(ast, block, env);
                let caught = match &result {
                    Err(err) => err.catchable(),
                    Ok(_) => None,
                };
                if let (Some(handler), Some(bound)) = (handler, caught) {
                    if let Node::CatchClause { param, body } = ast.node(handler) {
                        let (param, body) = (*param, *body);
                        let catch_env = Env::child(env);
                        if let Some(param) = param {
                            if let Some(n) = ast.ident_name(param) {
                                Env::define(&catch_env, n, bound);
                            }
                        }
                        result = self.eval_stmt(ast, body, &catch_env);
                    }
                }
                if let Some(finalizer) = finalizer {
                    match self.eval_stmt(ast, finalizer, env)? {
                        Flow::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
            Node::ClassDeclaration { .. } => {
                Err(EvalError::Unsupported("class evaluation".into()))
            }
            other => Err(EvalError::Unsupported(format!(
                "statement {:?}",
                other.kind()
            ))),
        }
    }

    fn eval_stmt_list(&mut self, ast: &Rc<Ast>, stmts: &[NodeId], env: &EnvRef) -> EResult<Flow> {
        for stmt in stmts {
            match self.eval_stmt(ast, *stmt, env)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Binds the loop variable of a for-in / for-of head.
    fn bind_for_target(
        &mut self,
        ast: &Rc<Ast>,
        left: NodeId,
        value: Value,
        env: &EnvRef,
    ) -> EResult<()> {
        match ast.node(left) {
            Node::VariableDeclaration { declarations, .. } => {
                if let Some(first) = declarations.first() {
                    if let Node::VariableDeclarator { id: name, .. } = ast.node(*first) {
                        if let Some(n) = ast.ident_name(*name) {
                            Env::define(env, n, value);
                        }
                    }
                }
                Ok(())
            }
            Node::Identifier { name } => {
                Env::assign(env, name, value);
                Ok(())
            }
            Node::MemberExpression { .. } => self.assign_to_member(ast, left, value, env),
            _ => Err(EvalError::Unsupported("loop binding pattern".into())),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn eval_expr(&mut self, ast: &Rc<Ast>, id: NodeId, env: &EnvRef) -> EResult<Value> {
        self.tick()?;
        match ast.node(id) {
            Node::Literal { value } => match value {
                LiteralValue::Null => Ok(Value::Null),
                LiteralValue::Boolean(b) => Ok(Value::Bool(*b)),
                LiteralValue::Number(n) => Ok(Value::Number(*n)),
                LiteralValue::String(s) => Ok(Value::str(s.clone())),
                LiteralValue::Regex { .. } => {
                    Err(EvalError::Unsupported("regex literal".into()))
                }
            },
            Node::Identifier { name } => {
                Env::lookup(env, name).ok_or_else(|| EvalError::Reference(name.clone()))
            }
            Node::ThisExpression => Ok(Env::lookup(env, "this").unwrap_or(Value::Undefined)),
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                let (quasis, expressions) = (quasis.clone(), expressions.clone());
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(&quasi.cooked);
                    if i < expressions.len() {
                        let v = self.eval_expr(ast, expressions[i], env)?;
                        out.push_str(&to_string(&v));
                    }
                    self.check_string(out.len())?;
                }
                Ok(Value::str(out))
            }
            Node::ArrayExpression { elements } => {
                let elements = elements.clone();
                let mut items = Vec::new();
                for el in elements {
                    match el {
                        None => items.push(Value::Undefined),
                        Some(el) => match ast.node(el) {
                            Node::SpreadElement { argument } => {
                                let spread = self.eval_expr(ast, *argument, env)?;
                                self.spread_into(&spread, &mut items)?;
                            }
                            _ => items.push(self.eval_expr(ast, el, env)?),
                        },
                    }
                    self.check_array(items.len())?;
                }
                Ok(Value::array(items))
            }
            Node::ObjectExpression { properties } => {
                let properties = properties.clone();
                let data = Rc::new(RefCell::new(ObjectData::default()));
                for prop in properties {
                    match ast.node(prop) {
                        Node::Property {
                            key,
                            value,
                            kind,
                            computed,
                            ..
                        } => {
                            if !matches!(kind, restringer_parser::ast::PropertyKind::Init) {
                                return Err(EvalError::Unsupported(
                                    "accessor property in sandbox".into(),
                                ));
                            }
                            let (key, value, computed) = (*key, *value, *computed);
                            let key = self.property_key(ast, key, computed, env)?;
                            let v = self.eval_expr(ast, value, env)?;
                            data.borrow_mut().set(&key, v);
                        }
                        Node::SpreadElement { argument } => {
                            let spread = self.eval_expr(ast, *argument, env)?;
                            if let Value::Object(o) = spread {
                                for (k, v) in o.borrow().entries() {
                                    data.borrow_mut().set(k, v.clone());
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Value::Object(data))
            }
            Node::FunctionExpression { .. } | Node::ArrowFunctionExpression { .. } => {
                Ok(self.make_function(ast, id, env))
            }
            Node::UnaryExpression { op, argument } => {
                let (op, argument) = (*op, *argument);
                match op {
                    UnaryOp::Typeof => {
                        // `typeof missing` must not throw.
                        if let Node::Identifier { name } = ast.node(argument) {
                            return Ok(Value::str(
                                Env::lookup(env, name)
                                    .map(|v| v.type_of())
                                    .unwrap_or("undefined"),
                            ));
                        }
                        let v = self.eval_expr(ast, argument, env)?;
                        Ok(Value::str(v.type_of()))
                    }
                    UnaryOp::Delete => match ast.node(argument) {
                        Node::MemberExpression {
                            object,
                            property,
                            computed,
                        } => {
                            let (object, property, computed) = (*object, *property, *computed);
                            let obj = self.eval_expr(ast, object, env)?;
                            let key = self.property_key(ast, property, computed, env)?;
                            match obj {
                                Value::Object(o) => Ok(Value::Bool(o.borrow_mut().delete(&key))),
                                _ => Ok(Value::Bool(true)),
                            }
                        }
                        _ => {
                            self.eval_expr(ast, argument, env)?;
                            Ok(Value::Bool(true))
                        }
                    },
                    _ => {
                        let v = self.eval_expr(ast, argument, env)?;
                        Ok(match op {
                            UnaryOp::Minus => Value::Number(-to_number(&v)),
                            UnaryOp::Plus => Value::Number(to_number(&v)),
                            UnaryOp::Not => Value::Bool(!v.is_truthy()),
                            UnaryOp::BitNot => Value::Number(!to_i32(&v) as f64),
                            UnaryOp::Void => Value::Undefined,
                            UnaryOp::Typeof | UnaryOp::Delete => unreachable!(),
                        })
                    }
                }
            }
            Node::UpdateExpression {
                op,
                argument,
                prefix,
            } => {
                let (op, argument, prefix) = (*op, *argument, *prefix);
                let old = to_number(&self.eval_expr(ast, argument, env)?);
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.assign_target(ast, argument, Value::Number(new), env)?;
                Ok(Value::Number(if prefix { new } else { old }))
            }
            Node::BinaryExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let l = self.eval_expr(ast, left, env)?;
                let r = self.eval_expr(ast, right, env)?;
                self.binary_op(op, &l, &r)
            }
            Node::LogicalExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let l = self.eval_expr(ast, left, env)?;
                match op {
                    LogicalOp::And => {
                        if l.is_truthy() {
                            self.eval_expr(ast, right, env)
                        } else {
                            Ok(l)
                        }
                    }
                    LogicalOp::Or => {
                        if l.is_truthy() {
                            Ok(l)
                        } else {
                            self.eval_expr(ast, right, env)
                        }
                    }
                    LogicalOp::Nullish => {
                        if matches!(l, Value::Undefined | Value::Null) {
                            self.eval_expr(ast, right, env)
                        } else {
                            Ok(l)
                        }
                    }
                }
            }
            Node::AssignmentExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let value = match op {
                    AssignOp::Assign => self.eval_expr(ast, right, env)?,
                    AssignOp::And | AssignOp::Or | AssignOp::Nullish => {
                        let current = self.eval_expr(ast, left, env)?;
                        let write = match op {
                            AssignOp::And => current.is_truthy(),
                            AssignOp::Or => !current.is_truthy(),
                            _ => matches!(current, Value::Undefined | Value::Null),
                        };
                        if !write {
                            return Ok(current);
                        }
                        self.eval_expr(ast, right, env)?
                    }
                    _ => {
                        let current = self.eval_expr(ast, left, env)?;
                        let r = self.eval_expr(ast, right, env)?;
                        let bin_op = match op {
                            AssignOp::Add => BinaryOp::Add,
                            AssignOp::Sub => BinaryOp::Sub,
                            AssignOp::Mul => BinaryOp::Mul,
                            AssignOp::Div => BinaryOp::Div,
                            AssignOp::Mod => BinaryOp::Mod,
                            AssignOp::Pow => BinaryOp::Pow,
                            AssignOp::Shl => BinaryOp::Shl,
                            AssignOp::Shr => BinaryOp::Shr,
                            AssignOp::UShr => BinaryOp::UShr,
                            AssignOp::BitAnd => BinaryOp::BitAnd,
                            AssignOp::BitOr => BinaryOp::BitOr,
                            AssignOp::BitXor => BinaryOp::BitXor,
                            _ => unreachable!(),
                        };
                        self.binary_op(bin_op, &current, &r)?
                    }
                };
                self.assign_target(ast, left, value.clone(), env)?;
                Ok(value)
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                if self.eval_expr(ast, test, env)?.is_truthy() {
                    self.eval_expr(ast, consequent, env)
                } else {
                    self.eval_expr(ast, alternate, env)
                }
            }
            Node::SequenceExpression { expressions } => {
                let expressions = expressions.clone();
                let mut last = Value::Undefined;
                for expr in expressions {
                    last = self.eval_expr(ast, expr, env)?;
                }
                Ok(last)
            }
            Node::CallExpression { callee, arguments } => {
                let (callee, arguments) = (*callee, arguments.clone());
                let args = self.eval_arguments(ast, &arguments, env)?;
                if let Node::MemberExpression {
                    object,
                    property,
                    computed,
                } = ast.node(callee)
                {
                    let (object, property, computed) = (*object, *property, *computed);
                    let obj = self.eval_expr(ast, object, env)?;
                    let key = self.property_key(ast, property, computed, env)?;
                    return self.call_member(&obj, &key, args);
                }
                let f = self.eval_expr(ast, callee, env)?;
                self.call_value(f, Value::Undefined, args)
            }
            Node::NewExpression { callee, arguments } => {
                let (callee, arguments) = (*callee, arguments.clone());
                let args = self.eval_arguments(ast, &arguments, env)?;
                let f = self.eval_expr(ast, callee, env)?;
                self.construct(f, args)
            }
            Node::MemberExpression {
                object,
                property,
                computed,
            } => {
                let (object, property, computed) = (*object, *property, *computed);
                let obj = self.eval_expr(ast, object, env)?;
                let key = self.property_key(ast, property, computed, env)?;
                self.get_property(&obj, &key)
            }
            Node::SpreadElement { .. } => {
                Err(EvalError::Unsupported("spread outside call/array".into()))
            }
            other => Err(EvalError::Unsupported(format!(
                "expression {:?}",
                other.kind()
            ))),
        }
    }

    fn eval_arguments(
        &mut self,
        ast: &Rc<Ast>,
        arguments: &[NodeId],
        env: &EnvRef,
    ) -> EResult<Vec<Value>> {
        let mut out = Vec::new();
        for arg in arguments {
            match ast.node(*arg) {
                Node::SpreadElement { argument } => {
                    let v = self.eval_expr(ast, *argument, env)?;
                    self.spread_into(&v, &mut out)?;
                }
                _ => out.push(self.eval_expr(ast, *arg, env)?),
            }
            self.check_array(out.len())?;
        }
        Ok(out)
    }

    fn spread_into(&mut self, value: &Value, out: &mut Vec<Value>) -> EResult<()> {
        match value {
            Value::Array(items) => out.extend(items.borrow().iter().cloned()),
            Value::Str(s) => out.extend(s.chars().map(|c| Value::str(c.to_string()))),
            _ => return Err(EvalError::Type("value is not spreadable".into())),
        }
        self.check_array(out.len())?;
        Ok(())
    }

    fn property_key(
        &mut self,
        ast: &Rc<Ast>,
        key: NodeId,
        computed: bool,
        env: &EnvRef,
    ) -> EResult<String> {
        if computed {
            let v = self.eval_expr(ast, key, env)?;
            return Ok(to_string(&v));
        }
        match ast.node(key) {
            Node::Identifier { name } => Ok(name.clone()),
            Node::Literal { value } => Ok(match value {
                LiteralValue::String(s) => s.clone(),
                other => to_string(&literal_to_value(other)),
            }),
            _ => Err(EvalError::Unsupported("property key form".into())),
        }
    }

    fn binary_op(&mut self, op: BinaryOp, l: &Value, r: &Value) -> EResult<Value> {
        Ok(match op {
            BinaryOp::Add => {
                let lp = to_primitive(l);
                let rp = to_primitive(r);
                if matches!(lp, Value::Str(_)) || matches!(rp, Value::Str(_)) {
                    let s = format!("{}{}", to_string(&lp), to_string(&rp));
                    self.check_string(s.len())?;
                    Value::str(s)
                } else {
                    Value::Number(to_number(&lp) + to_number(&rp))
                }
            }
            BinaryOp::Sub => Value::Number(to_number(l) - to_number(r)),
            BinaryOp::Mul => Value::Number(to_number(l) * to_number(r)),
            BinaryOp::Div => Value::Number(to_number(l) / to_number(r)),
            BinaryOp::Mod => Value::Number(to_number(l) % to_number(r)),
            BinaryOp::Pow => Value::Number(to_number(l).powf(to_number(r))),
            BinaryOp::Eq => Value::Bool(loose_eq(l, r)),
            BinaryOp::NotEq => Value::Bool(!loose_eq(l, r)),
            BinaryOp::StrictEq => Value::Bool(strict_eq(l, r)),
            BinaryOp::StrictNotEq => Value::Bool(!strict_eq(l, r)),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let lp = to_primitive(l);
                let rp = to_primitive(r);
                let result = if let (Value::Str(a), Value::Str(b)) = (&lp, &rp) {
                    match op {
                        BinaryOp::Lt => a < b,
                        BinaryOp::LtEq => a <= b,
                        BinaryOp::Gt => a > b,
                        _ => a >= b,
                    }
                } else {
                    let a = to_number(&lp);
                    let b = to_number(&rp);
                    if a.is_nan() || b.is_nan() {
                        false
                    } else {
                        match op {
                            BinaryOp::Lt => a < b,
                            BinaryOp::LtEq => a <= b,
                            BinaryOp::Gt => a > b,
                            _ => a >= b,
                        }
                    }
                };
                Value::Bool(result)
            }
            BinaryOp::Shl => Value::Number((to_i32(l) << (to_u32(r) & 31)) as f64),
            BinaryOp::Shr => Value::Number((to_i32(l) >> (to_u32(r) & 31)) as f64),
            BinaryOp::UShr => Value::Number((to_u32(l) >> (to_u32(r) & 31)) as f64),
            BinaryOp::BitAnd => Value::Number((to_i32(l) & to_i32(r)) as f64),
            BinaryOp::BitOr => Value::Number((to_i32(l) | to_i32(r)) as f64),
            BinaryOp::BitXor => Value::Number((to_i32(l) ^ to_i32(r)) as f64),
            BinaryOp::In => {
                let key = to_string(l);
                match r {
                    Value::Object(o) => Value::Bool(o.borrow().get(&key).is_some()),
                    Value::Array(a) => {
                        let idx = key.parse::<usize>().ok();
                        Value::Bool(idx.is_some_and(|i| i < a.borrow().len()) || key == "length")
                    }
                    _ => return Err(EvalError::Type("'in' on non-object".into())),
                }
            }
            BinaryOp::Instanceof => {
                let result = match (l, r) {
                    (Value::Object(o), Value::Function(f)) => {
                        let proto = f.prototype.borrow().clone();
                        match proto {
                            Some(proto) => {
                                let mut current = o.borrow().proto.clone();
                                let mut matched = false;
                                while let Some(p) = current {
                                    if Rc::ptr_eq(&p, &proto) {
                                        matched = true;
                                        break;
                                    }
                                    current = p.borrow().proto.clone();
                                }
                                matched
                            }
                            None => false,
                        }
                    }
                    _ => false,
                };
                Value::Bool(result)
            }
        })
    }

    fn assign_target(
        &mut self,
        ast: &Rc<Ast>,
        target: NodeId,
        value: Value,
        env: &EnvRef,
    ) -> EResult<()> {
        match ast.node(target) {
            Node::Identifier { name } => {
                Env::assign(env, name, value);
                Ok(())
            }
            Node::MemberExpression { .. } => self.assign_to_member(ast, target, value, env),
            _ => Err(EvalError::Type("invalid assignment target".into())),
        }
    }

    fn assign_to_member(
        &mut self,
        ast: &Rc<Ast>,
        member: NodeId,
        value: Value,
        env: &EnvRef,
    ) -> EResult<()> {
        let Node::MemberExpression {
            object,
            property,
            computed,
        } = ast.node(member)
        else {
            return Err(EvalError::Type("invalid member target".into()));
        };
        let (object, property, computed) = (*object, *property, *computed);
        let obj = self.eval_expr(ast, object, env)?;
        let key = self.property_key(ast, property, computed, env)?;
        self.set_property(&obj, &key, value)
    }

    pub(crate) fn set_property(&mut self, obj: &Value, key: &str, value: Value) -> EResult<()> {
        match obj {
            Value::Object(o) => {
                o.borrow_mut().set(key, value);
                Ok(())
            }
            Value::Array(a) => {
                if key == "length" {
                    let len = to_number(&value) as usize;
                    self.check_array(len)?;
                    a.borrow_mut().resize(len, Value::Undefined);
                    return Ok(());
                }
                if let Ok(index) = key.parse::<usize>() {
                    self.check_array(index + 1)?;
                    let mut items = a.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            Value::Function(f) => {
                if key == "prototype" {
                    if let Value::Object(o) = value {
                        *f.prototype.borrow_mut() = Some(o);
                        return Ok(());
                    }
                }
                f.props.borrow_mut().set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(EvalError::Type(format!(
                "cannot set property {key} of {}",
                obj.type_of()
            ))),
            // Primitive receivers silently drop writes.
            _ => Ok(()),
        }
    }

    pub(crate) fn get_property(&mut self, obj: &Value, key: &str) -> EResult<Value> {
        match obj {
            Value::Undefined | Value::Null => Err(EvalError::Type(format!(
                "cannot read property {key} of {}",
                obj.type_of()
            ))),
            Value::Str(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::str(c.to_string()))
                        .unwrap_or(Value::Undefined));
                }
                Ok(self.method_ref(obj, key))
            }
            Value::Array(a) => {
                if key == "length" {
                    return Ok(Value::Number(a.borrow().len() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(a.borrow().get(index).cloned().unwrap_or(Value::Undefined));
                }
                Ok(self.method_ref(obj, key))
            }
            Value::Object(o) => {
                if let Some(v) = o.borrow().get(key) {
                    return Ok(v);
                }
                Ok(self.method_ref(obj, key))
            }
            Value::Function(f) => {
                if key == "prototype" {
                    return Ok(Value::Object(f.prototype_object()));
                }
                if key == "name" {
                    return Ok(Value::str(f.name.clone().unwrap_or_default()));
                }
                if key == "length" {
                    return Ok(Value::Number(f.params.len() as f64));
                }
                if let Some(v) = f.props.borrow().get_own(key) {
                    return Ok(v);
                }
                Ok(self.method_ref(obj, key))
            }
            Value::Native(ns) => builtins::native_member(ns, key),
            Value::Number(_) | Value::Bool(_) | Value::Method(_) => Ok(self.method_ref(obj, key)),
        }
    }

    fn method_ref(&self, recv: &Value, name: &str) -> Value {
        Value::Method(Rc::new(BoundMethod {
            recv: recv.clone(),
            name: name.to_string(),
        }))
    }

    pub fn call_value(&mut self, callee: Value, this: Value, args: Vec<Value>) -> EResult<Value> {
        match callee {
            Value::Function(f) => self.call_function(&f, this, args),
            Value::Native(name) => builtins::call_native(self, name, this, args),
            Value::Method(m) => self.call_member(&m.recv.clone(), &m.name.clone(), args),
            other => Err(EvalError::Type(format!(
                "{} is not a function",
                to_string(&other)
            ))),
        }
    }

    /// Calls `obj.key(args)`: own (and prototype) function properties
    /// first, builtin method library second.
    pub fn call_member(&mut self, obj: &Value, key: &str, args: Vec<Value>) -> EResult<Value> {
        let own = match obj {
            Value::Object(o) => o.borrow().get(key),
            Value::Function(f) => f.props.borrow().get_own(key),
            _ => None,
        };
        if let Some(f) = own {
            if f.is_callable() {
                return self.call_value(f, obj.clone(), args);
            }
            return Err(EvalError::Type(format!("{key} is not a function")));
        }
        builtins::call_method(self, obj, key, args)
    }

    pub fn call_function(
        &mut self,
        f: &Rc<FunctionValue>,
        this: Value,
        args: Vec<Value>,
    ) -> EResult<Value> {
        self.tick()?;
        self.depth += 1;
        if self.depth > self.limits.max_call_depth {
            self.depth -= 1;
            return Err(EvalError::StepLimit);
        }
        let result = self.call_function_inner(f, this, args);
        self.depth -= 1;
        result
    }

    fn call_function_inner(
        &mut self,
        f: &Rc<FunctionValue>,
        this: Value,
        args: Vec<Value>,
    ) -> EResult<Value> {
        let env = Env::child(&f.env);
        if !f.is_arrow {
            Env::define(&env, "this", this);
            Env::define(&env, "arguments", Value::array(args.clone()));
        }
        for (i, param) in f.params.iter().enumerate() {
            Env::define(&env, param, args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        let ast = f.ast.clone();
        if f.expression_body {
            return self.eval_expr(&ast, f.body, &env);
        }
        let Node::BlockStatement { body } = ast.node(f.body) else {
            return self.eval_expr(&ast, f.body, &env);
        };
        let body = body.clone();
        self.hoist(&ast, &body, &env, true);
        match self.eval_stmt_list(&ast, &body, &env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Undefined),
        }
    }

    fn construct(&mut self, callee: Value, args: Vec<Value>) -> EResult<Value> {
        match callee {
            Value::Function(f) => {
                let data = Rc::new(RefCell::new(ObjectData::with_proto(f.prototype_object())));
                let this = Value::Object(data.clone());
                let ret = self.call_function(&f, this.clone(), args)?;
                Ok(match ret {
                    Value::Object(_) | Value::Array(_) => ret,
                    _ => this,
                })
            }
            Value::Native(name) => builtins::construct_native(self, name, args),
            other => Err(EvalError::Type(format!(
                "{} is not a constructor",
                to_string(&other)
            ))),
        }
    }
}

pub(crate) fn literal_to_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Null => Value::Null,
        LiteralValue::Boolean(b) => Value::Bool(*b),
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::str(s.clone()),
        LiteralValue::Regex { .. } => Value::Undefined,
    }
}
