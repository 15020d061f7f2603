//! Deterministic host-safe builtins for the sandbox. The table contains
//! no filesystem, network or process access, so sandbox isolation holds
//! by construction. `Math.random`, `Date` and timers are deliberately absent
//! so every resolution the engine bakes into the output is reproducible.

use super::interp::{error_object, EResult, EvalError, Interp};
use super::value::{to_number, to_string, BoundMethod, Env, EnvRef, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use restringer_parser::codegen::format_number;
use std::rc::Rc;

const NATIVE_GLOBALS: &[&str] = &[
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
    "isNaN",
    "isFinite",
    "String",
    "Number",
    "Boolean",
    "Array",
    "Object",
    "Math",
    "JSON",
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
];

pub fn install_globals(env: &EnvRef) {
    Env::define(env, "undefined", Value::Undefined);
    Env::define(env, "NaN", Value::Number(f64::NAN));
    Env::define(env, "Infinity", Value::Number(f64::INFINITY));
    for name in NATIVE_GLOBALS {
        Env::define(env, name, Value::Native(name));
    }
}

/// A global builtin invoked as a plain function.
pub fn call_native(interp: &mut Interp, name: &str, _this: Value, args: Vec<Value>) -> EResult<Value> {
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    match name {
        "atob" => atob(&to_string(&arg0)),
        "btoa" => btoa(&to_string(&arg0)),
        "escape" => Ok(Value::str(js_escape(&to_string(&arg0)))),
        "unescape" => Ok(Value::str(js_unescape(&to_string(&arg0)))),
        "encodeURIComponent" => Ok(Value::str(uri_encode(&to_string(&arg0), false))),
        "encodeURI" => Ok(Value::str(uri_encode(&to_string(&arg0), true))),
        "decodeURIComponent" | "decodeURI" => uri_decode(&to_string(&arg0)),
        "parseInt" => Ok(Value::Number(parse_int(
            &to_string(&arg0),
            args.get(1).map(to_number),
        ))),
        "parseFloat" => Ok(Value::Number(parse_float(&to_string(&arg0)))),
        "isNaN" => Ok(Value::Bool(to_number(&arg0).is_nan())),
        "isFinite" => Ok(Value::Bool(to_number(&arg0).is_finite())),
        "String" => Ok(Value::str(if args.is_empty() {
            String::new()
        } else {
            to_string(&arg0)
        })),
        "Number" => Ok(Value::Number(if args.is_empty() {
            0.0
        } else {
            to_number(&arg0)
        })),
        "Boolean" => Ok(Value::Bool(arg0.is_truthy())),
        "Array" => construct_native(interp, "Array", args),
        "Object" => Ok(match arg0 {
            Value::Object(_) | Value::Array(_) => arg0,
            _ => Value::object(),
        }),
        "Error" | "TypeError" | "RangeError" | "SyntaxError" | "ReferenceError" => {
            Ok(error_object(name, &to_string(&arg0)))
        }
        "Math" | "JSON" => Err(EvalError::Type(format!("{name} is not a function"))),
        other => Err(EvalError::Unsupported(format!("native {other}"))),
    }
}

/// `new Native(...)`.
pub fn construct_native(interp: &mut Interp, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "Array" => {
            if args.len() == 1 {
                if let Value::Number(n) = args[0] {
                    let len = n as usize;
                    interp.check_array(len)?;
                    return Ok(Value::array(vec![Value::Undefined; len]));
                }
            }
            Ok(Value::array(args))
        }
        "Error" | "TypeError" | "RangeError" | "SyntaxError" | "ReferenceError" => Ok(error_object(
            name,
            &args.first().map(to_string).unwrap_or_default(),
        )),
        "Object" => Ok(Value::object()),
        "String" | "Number" | "Boolean" => {
            call_native(interp, name, Value::Undefined, args)
        }
        other => Err(EvalError::Unsupported(format!("new {other}()"))),
    }
}

/// Property read off a native namespace (`Math.PI`, `String.fromCharCode`).
pub fn native_member(ns: &str, key: &str) -> EResult<Value> {
    match (ns, key) {
        ("Math", "PI") => Ok(Value::Number(std::f64::consts::PI)),
        ("Math", "E") => Ok(Value::Number(std::f64::consts::E)),
        ("Number", "MAX_SAFE_INTEGER") => Ok(Value::Number(9007199254740991.0)),
        ("Number", "MIN_SAFE_INTEGER") => Ok(Value::Number(-9007199254740991.0)),
        _ => Ok(Value::Method(Rc::new(BoundMethod {
            recv: Value::Native(match_static_name(ns)),
            name: key.to_string(),
        }))),
    }
}

fn match_static_name(ns: &str) -> &'static str {
    NATIVE_GLOBALS
        .iter()
        .find(|n| **n == ns)
        .copied()
        .unwrap_or("Object")
}

/// Builtin method dispatch: `recv.name(args)` where `recv` has no own
/// property of that name.
pub fn call_method(interp: &mut Interp, recv: &Value, name: &str, args: Vec<Value>) -> EResult<Value> {
    // Function-protocol methods work on every callable.
    if recv.is_callable() && matches!(name, "call" | "apply") {
        let this = args.first().cloned().unwrap_or(Value::Undefined);
        let rest: Vec<Value> = if name == "call" {
            args.iter().skip(1).cloned().collect()
        } else {
            match args.get(1) {
                Some(Value::Array(a)) => a.borrow().clone(),
                Some(Value::Undefined) | Some(Value::Null) | None => Vec::new(),
                Some(other) => return Err(EvalError::Type(format!(
                    "apply argument list is not an array: {}",
                    to_string(other)
                ))),
            }
        };
        return match recv {
            Value::Function(f) => interp.call_function(f, this, rest),
            Value::Native(ns) => call_native(interp, ns, this, rest),
            Value::Method(m) => call_method(interp, &m.recv.clone(), &m.name.clone(), rest),
            _ => unreachable!(),
        };
    }
    if recv.is_callable() && name == "toString" {
        return Ok(Value::str(to_string(recv)));
    }

    match recv {
        Value::Native(ns) => native_namespace_method(interp, ns, name, args),
        Value::Method(m) => {
            // Calling an unrelated method on a plucked method value.
            Err(EvalError::Unsupported(format!("{}.{name}", m.name)))
        }
        Value::Str(s) => string_method(interp, s, name, args),
        Value::Array(_) => array_method(interp, recv, name, args),
        Value::Number(n) => number_method(*n, name, args),
        Value::Bool(b) => match name {
            "toString" => Ok(Value::str(if *b { "true" } else { "false" })),
            "valueOf" => Ok(Value::Bool(*b)),
            _ => Err(EvalError::Type(format!("boolean has no method {name}"))),
        },
        Value::Object(o) => match name {
            "hasOwnProperty" => {
                let key = to_string(&args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Bool(o.borrow().get_own(&key).is_some()))
            }
            "toString" => Ok(Value::str("[object Object]")),
            "valueOf" => Ok(recv.clone()),
            _ => Err(EvalError::Type(format!("object has no method {name}"))),
        },
        Value::Function(_) => Err(EvalError::Type(format!("function has no method {name}"))),
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "cannot call {name} of {}",
            recv.type_of()
        ))),
    }
}

fn native_namespace_method(
    interp: &mut Interp,
    ns: &str,
    name: &str,
    args: Vec<Value>,
) -> EResult<Value> {
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    match (ns, name) {
        ("Math", _) => {
            let x = to_number(&arg0);
            let result = match name {
                "floor" => x.floor(),
                "ceil" => x.ceil(),
                "round" => (x + 0.5).floor(),
                "trunc" => x.trunc(),
                "abs" => x.abs(),
                "sqrt" => x.sqrt(),
                "sign" => {
                    if x.is_nan() {
                        f64::NAN
                    } else if x > 0.0 {
                        1.0
                    } else if x < 0.0 {
                        -1.0
                    } else {
                        x
                    }
                }
                "pow" => x.powf(to_number(&args.get(1).cloned().unwrap_or(Value::Undefined))),
                "max" => args
                    .iter()
                    .map(to_number)
                    .fold(f64::NEG_INFINITY, f64::max),
                "min" => args.iter().map(to_number).fold(f64::INFINITY, f64::min),
                "log" => x.ln(),
                "log2" => x.log2(),
                "log10" => x.log10(),
                "exp" => x.exp(),
                "random" => {
                    return Err(EvalError::Unsupported(
                        "Math.random is non-deterministic".into(),
                    ))
                }
                _ => return Err(EvalError::Unsupported(format!("Math.{name}"))),
            };
            Ok(Value::Number(result))
        }
        ("String", "fromCharCode") | ("String", "fromCodePoint") => {
            let mut out = String::new();
            for arg in &args {
                let code = to_number(arg);
                if !code.is_finite() || code < 0.0 {
                    return Err(EvalError::Type("invalid code point".into()));
                }
                let c = char::from_u32(code as u32).unwrap_or('\u{fffd}');
                out.push(c);
            }
            interp.check_string(out.len())?;
            Ok(Value::str(out))
        }
        ("JSON", "stringify") => Ok(json_stringify(&arg0)),
        ("JSON", "parse") => json_parse(&to_string(&arg0)),
        ("Object", "keys") => match arg0 {
            Value::Object(o) => Ok(Value::array(
                o.borrow().keys().into_iter().map(Value::str).collect(),
            )),
            Value::Array(a) => Ok(Value::array(
                (0..a.borrow().len())
                    .map(|i| Value::str(i.to_string()))
                    .collect(),
            )),
            _ => Ok(Value::array(vec![])),
        },
        ("Object", "values") => match arg0 {
            Value::Object(o) => Ok(Value::array(
                o.borrow().entries().iter().map(|(_, v)| v.clone()).collect(),
            )),
            Value::Array(a) => Ok(Value::Array(a)),
            _ => Ok(Value::array(vec![])),
        },
        ("Object", "freeze") => Ok(arg0),
        ("Array", "isArray") => Ok(Value::Bool(matches!(arg0, Value::Array(_)))),
        ("Number", "parseInt") => call_native(interp, "parseInt", Value::Undefined, args),
        ("Number", "parseFloat") => call_native(interp, "parseFloat", Value::Undefined, args),
        ("Number", "isInteger") => Ok(Value::Bool(
            matches!(arg0, Value::Number(n) if n.fract() == 0.0 && n.is_finite()),
        )),
        _ => Err(EvalError::Unsupported(format!("{ns}.{name}"))),
    }
}

// ----------------------------------------------------------------------
// String methods
// ----------------------------------------------------------------------

fn string_method(interp: &mut Interp, s: &Rc<String>, name: &str, args: Vec<Value>) -> EResult<Value> {
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    match name {
        "charAt" => {
            let i = to_number(&arg0);
            let i = if i.is_nan() { 0.0 } else { i };
            Ok(Value::str(
                if i >= 0.0 && (i as usize) < len {
                    chars[i as usize].to_string()
                } else {
                    String::new()
                },
            ))
        }
        "charCodeAt" | "codePointAt" => {
            let i = to_number(&arg0);
            let i = if i.is_nan() { 0.0 } else { i };
            if i >= 0.0 && (i as usize) < len {
                Ok(Value::Number(chars[i as usize] as u32 as f64))
            } else if name == "charCodeAt" {
                Ok(Value::Number(f64::NAN))
            } else {
                Ok(Value::Undefined)
            }
        }
        "at" => {
            let mut i = to_number(&arg0);
            if i < 0.0 {
                i += len as f64;
            }
            Ok(if i >= 0.0 && (i as usize) < len {
                Value::str(chars[i as usize].to_string())
            } else {
                Value::Undefined
            })
        }
        "indexOf" => {
            let needle = to_string(&arg0);
            Ok(Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            }))
        }
        "lastIndexOf" => {
            let needle = to_string(&arg0);
            Ok(Value::Number(match s.rfind(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            }))
        }
        "includes" => Ok(Value::Bool(s.contains(&to_string(&arg0)))),
        "startsWith" => Ok(Value::Bool(s.starts_with(&to_string(&arg0)))),
        "endsWith" => Ok(Value::Bool(s.ends_with(&to_string(&arg0)))),
        "slice" => {
            let (start, end) = slice_bounds(&args, len);
            Ok(Value::str(chars[start..end].iter().collect::<String>()))
        }
        "substring" => {
            let mut a = clamp_index(to_number(&arg0), len);
            let mut b = match args.get(1) {
                Some(Value::Undefined) | None => len,
                Some(v) => clamp_index(to_number(v), len),
            };
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            Ok(Value::str(chars[a..b].iter().collect::<String>()))
        }
        "substr" => {
            let start = {
                let i = to_number(&arg0);
                if i < 0.0 {
                    len.saturating_sub((-i) as usize)
                } else {
                    (i as usize).min(len)
                }
            };
            let count = match args.get(1) {
                Some(Value::Undefined) | None => len - start,
                Some(v) => (to_number(v).max(0.0) as usize).min(len - start),
            };
            Ok(Value::str(
                chars[start..start + count].iter().collect::<String>(),
            ))
        }
        "split" => {
            let parts: Vec<Value> = match &arg0 {
                Value::Undefined => vec![Value::str(s.as_ref().clone())],
                _ => {
                    let sep = to_string(&arg0);
                    if sep.is_empty() {
                        chars.iter().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(&sep).map(Value::str).collect()
                    }
                }
            };
            let limited = match args.get(1) {
                Some(Value::Undefined) | None => parts,
                Some(v) => {
                    let limit = to_number(v).max(0.0) as usize;
                    parts.into_iter().take(limit).collect()
                }
            };
            interp.check_array(limited.len())?;
            Ok(Value::array(limited))
        }
        "concat" => {
            let mut out = s.as_ref().clone();
            for arg in &args {
                out.push_str(&to_string(arg));
                interp.check_string(out.len())?;
            }
            Ok(Value::str(out))
        }
        "repeat" => {
            let count = to_number(&arg0);
            if !(0.0..=1e7).contains(&count) {
                return Err(EvalError::Type("invalid repeat count".into()));
            }
            let out = s.repeat(count as usize);
            interp.check_string(out.len())?;
            Ok(Value::str(out))
        }
        "replace" | "replaceAll" => {
            if matches!(arg0, Value::Object(_) | Value::Array(_)) {
                return Err(EvalError::Unsupported("regex replace".into()));
            }
            let pattern = to_string(&arg0);
            let replacement = match args.get(1) {
                Some(v) if v.is_callable() => {
                    return Err(EvalError::Unsupported("replace with callback".into()))
                }
                Some(v) => to_string(v),
                None => "undefined".to_string(),
            };
            let out = if name == "replaceAll" {
                s.replace(&pattern, &replacement)
            } else {
                s.replacen(&pattern, &replacement, 1)
            };
            interp.check_string(out.len())?;
            Ok(Value::str(out))
        }
        "toUpperCase" | "toLocaleUpperCase" => Ok(Value::str(s.to_uppercase())),
        "toLowerCase" | "toLocaleLowerCase" => Ok(Value::str(s.to_lowercase())),
        "trim" => Ok(Value::str(s.trim())),
        "trimStart" => Ok(Value::str(s.trim_start())),
        "trimEnd" => Ok(Value::str(s.trim_end())),
        "padStart" | "padEnd" => {
            let target = to_number(&arg0).max(0.0) as usize;
            let pad = match args.get(1) {
                Some(Value::Undefined) | None => " ".to_string(),
                Some(v) => to_string(v),
            };
            interp.check_string(target)?;
            let mut out = s.as_ref().clone();
            if pad.is_empty() {
                return Ok(Value::str(out));
            }
            let mut padding = String::new();
            while len + padding.chars().count() < target {
                padding.push_str(&pad);
            }
            let needed = target.saturating_sub(len);
            let padding: String = padding.chars().take(needed).collect();
            if name == "padStart" {
                out = format!("{padding}{out}");
            } else {
                out.push_str(&padding);
            }
            Ok(Value::str(out))
        }
        "toString" | "valueOf" => Ok(Value::str(s.as_ref().clone())),
        "localeCompare" => {
            let other = to_string(&arg0);
            Ok(Value::Number(match s.as_ref().as_str().cmp(other.as_str()) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            }))
        }
        "match" | "search" | "matchAll" => Err(EvalError::Unsupported("regex matching".into())),
        _ => Err(EvalError::Type(format!("string has no method {name}"))),
    }
}

fn clamp_index(i: f64, len: usize) -> usize {
    if i.is_nan() {
        return 0;
    }
    if i < 0.0 {
        0
    } else {
        (i as usize).min(len)
    }
}

fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let resolve = |v: Option<&Value>, default: usize| -> usize {
        match v {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let i = to_number(v);
                if i < 0.0 {
                    len.saturating_sub((-i) as usize)
                } else {
                    (i as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

// ----------------------------------------------------------------------
// Array methods
// ----------------------------------------------------------------------

fn array_method(interp: &mut Interp, recv: &Value, name: &str, args: Vec<Value>) -> EResult<Value> {
    let Value::Array(a) = recv else {
        return Err(EvalError::Type("not an array".into()));
    };
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    match name {
        "push" => {
            let mut items = a.borrow_mut();
            items.extend(args.iter().cloned());
            interp.check_array(items.len())?;
            Ok(Value::Number(items.len() as f64))
        }
        "pop" => Ok(a.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "shift" => {
            let mut items = a.borrow_mut();
            if items.is_empty() {
                Ok(Value::Undefined)
            } else {
                Ok(items.remove(0))
            }
        }
        "unshift" => {
            let mut items = a.borrow_mut();
            for (i, arg) in args.iter().enumerate() {
                items.insert(i, arg.clone());
            }
            interp.check_array(items.len())?;
            Ok(Value::Number(items.len() as f64))
        }
        "slice" => {
            let len = a.borrow().len();
            let (start, end) = slice_bounds(&args, len);
            Ok(Value::array(a.borrow()[start..end].to_vec()))
        }
        "splice" => {
            let len = a.borrow().len();
            let start = clamp_splice_start(to_number(&arg0), len);
            let delete = match args.get(1) {
                None => len - start,
                Some(v) => (to_number(v).max(0.0) as usize).min(len - start),
            };
            let mut items = a.borrow_mut();
            let removed: Vec<Value> = items.splice(start..start + delete, args.iter().skip(2).cloned()).collect();
            interp.check_array(items.len())?;
            Ok(Value::array(removed))
        }
        "join" => {
            let sep = match &arg0 {
                Value::Undefined => ",".to_string(),
                other => to_string(other),
            };
            let parts: Vec<String> = a
                .borrow()
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => to_string(other),
                })
                .collect();
            let out = parts.join(&sep);
            interp.check_string(out.len())?;
            Ok(Value::str(out))
        }
        "indexOf" => {
            let found = a
                .borrow()
                .iter()
                .position(|v| super::value::strict_eq(v, &arg0));
            Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
        }
        "lastIndexOf" => {
            let found = a
                .borrow()
                .iter()
                .rposition(|v| super::value::strict_eq(v, &arg0));
            Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
        }
        "includes" => Ok(Value::Bool(
            a.borrow().iter().any(|v| super::value::strict_eq(v, &arg0)),
        )),
        "concat" => {
            let mut out = a.borrow().clone();
            for arg in &args {
                match arg {
                    Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
                interp.check_array(out.len())?;
            }
            Ok(Value::array(out))
        }
        "reverse" => {
            a.borrow_mut().reverse();
            Ok(recv.clone())
        }
        "fill" => {
            let len = a.borrow().len();
            let (start, end) = match args.len() {
                0 | 1 => (0, len),
                _ => slice_bounds(&args[1..], len),
            };
            let mut items = a.borrow_mut();
            for slot in items[start..end].iter_mut() {
                *slot = arg0.clone();
            }
            Ok(recv.clone())
        }
        "flat" => {
            let mut out = Vec::new();
            for v in a.borrow().iter() {
                match v {
                    Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            interp.check_array(out.len())?;
            Ok(Value::array(out))
        }
        "map" | "filter" | "forEach" | "find" | "findIndex" | "some" | "every" => {
            let items = a.borrow().clone();
            let mut mapped = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let ret = interp.call_value(
                    arg0.clone(),
                    Value::Undefined,
                    vec![item.clone(), Value::Number(i as f64), recv.clone()],
                )?;
                match name {
                    "map" => mapped.push(ret),
                    "filter" => {
                        if ret.is_truthy() {
                            mapped.push(item.clone());
                        }
                    }
                    "find" => {
                        if ret.is_truthy() {
                            return Ok(item.clone());
                        }
                    }
                    "findIndex" => {
                        if ret.is_truthy() {
                            return Ok(Value::Number(i as f64));
                        }
                    }
                    "some" => {
                        if ret.is_truthy() {
                            return Ok(Value::Bool(true));
                        }
                    }
                    "every" => {
                        if !ret.is_truthy() {
                            return Ok(Value::Bool(false));
                        }
                    }
                    _ => {}
                }
            }
            match name {
                "map" | "filter" => Ok(Value::array(mapped)),
                "forEach" => Ok(Value::Undefined),
                "find" => Ok(Value::Undefined),
                "findIndex" => Ok(Value::Number(-1.0)),
                "some" => Ok(Value::Bool(false)),
                "every" => Ok(Value::Bool(true)),
                _ => unreachable!(),
            }
        }
        "reduce" => {
            let items = a.borrow().clone();
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(seed) => seed.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => return Err(EvalError::Type("reduce of empty array".into())),
                },
            };
            for (i, item) in iter {
                acc = interp.call_value(
                    arg0.clone(),
                    Value::Undefined,
                    vec![acc, item.clone(), Value::Number(i as f64), recv.clone()],
                )?;
            }
            Ok(acc)
        }
        "sort" => {
            let mut items = a.borrow().clone();
            let comparator = if arg0.is_callable() { Some(arg0) } else { None };
            // Insertion sort so the comparator can re-enter the interpreter.
            for i in 1..items.len() {
                let mut j = i;
                while j > 0 {
                    let ordered = match &comparator {
                        Some(cmp) => {
                            let r = interp.call_value(
                                cmp.clone(),
                                Value::Undefined,
                                vec![items[j - 1].clone(), items[j].clone()],
                            )?;
                            to_number(&r) <= 0.0
                        }
                        None => to_string(&items[j - 1]) <= to_string(&items[j]),
                    };
                    if ordered {
                        break;
                    }
                    items.swap(j - 1, j);
                    j -= 1;
                }
            }
            *a.borrow_mut() = items;
            Ok(recv.clone())
        }
        "toString" => Ok(Value::str(to_string(recv))),
        "valueOf" => Ok(recv.clone()),
        _ => Err(EvalError::Type(format!("array has no method {name}"))),
    }
}

fn clamp_splice_start(i: f64, len: usize) -> usize {
    if i < 0.0 {
        len.saturating_sub((-i) as usize)
    } else {
        (i as usize).min(len)
    }
}

// ----------------------------------------------------------------------
// Number methods
// ----------------------------------------------------------------------

fn number_method(n: f64, name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "toString" => {
            let radix = match args.first() {
                None | Some(Value::Undefined) => 10,
                Some(v) => to_number(v) as u32,
            };
            if radix == 10 {
                return Ok(Value::str(format_number(n)));
            }
            if !(2..=36).contains(&radix) {
                return Err(EvalError::Type("invalid radix".into()));
            }
            if n.fract() != 0.0 || !n.is_finite() {
                return Err(EvalError::Unsupported("non-integer radix conversion".into()));
            }
            Ok(Value::str(format_radix(n as i64, radix)))
        }
        "toFixed" => {
            let digits = args.first().map(to_number).unwrap_or(0.0) as usize;
            if digits > 100 {
                return Err(EvalError::Type("invalid digit count".into()));
            }
            Ok(Value::str(format!("{n:.digits$}")))
        }
        "valueOf" => Ok(Value::Number(n)),
        _ => Err(EvalError::Type(format!("number has no method {name}"))),
    }
}

fn format_radix(mut n: i64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % radix as i64) as usize]);
        n /= radix as i64;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).expect("radix digits are ascii")
}

// ----------------------------------------------------------------------
// Encoding helpers (atob/btoa, escape, URI codecs, parseInt)
// ----------------------------------------------------------------------

pub fn atob(input: &str) -> EResult<Value> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    // Browsers accept unpadded input.
    let padded = match cleaned.len() % 4 {
        2 => format!("{cleaned}=="),
        3 => format!("{cleaned}="),
        _ => cleaned,
    };
    let bytes = BASE64
        .decode(padded.as_bytes())
        .map_err(|e| EvalError::Type(format!("invalid base64: {e}")))?;
    // atob yields a latin-1 string: one char per byte.
    Ok(Value::str(bytes.iter().map(|b| *b as char).collect::<String>()))
}

pub fn btoa(input: &str) -> EResult<Value> {
    let mut bytes = Vec::with_capacity(input.len());
    for c in input.chars() {
        let code = c as u32;
        if code > 0xff {
            return Err(EvalError::Type(
                "btoa on characters outside latin-1".into(),
            ));
        }
        bytes.push(code as u8);
    }
    Ok(Value::str(BASE64.encode(bytes)))
}

fn js_escape(input: &str) -> String {
    let mut out = String::new();
    for c in input.chars() {
        let code = c as u32;
        if c.is_ascii_alphanumeric() || matches!(c, '@' | '*' | '_' | '+' | '-' | '.' | '/') {
            out.push(c);
        } else if code < 0x100 {
            out.push_str(&format!("%{code:02X}"));
        } else {
            out.push_str(&format!("%u{code:04X}"));
        }
    }
    out
}

fn js_unescape(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            if i + 5 < chars.len() && chars[i + 1] == 'u' {
                if let Ok(code) =
                    u32::from_str_radix(&chars[i + 2..i + 6].iter().collect::<String>(), 16)
                {
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    i += 6;
                    continue;
                }
            }
            if i + 2 < chars.len() {
                if let Ok(code) =
                    u32::from_str_radix(&chars[i + 1..i + 3].iter().collect::<String>(), 16)
                {
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    i += 3;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn uri_encode(input: &str, full_uri: bool) -> String {
    let unreserved = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
            || (full_uri && matches!(c, ';' | ',' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | '#'))
    };
    let mut out = String::new();
    for c in input.chars() {
        if unreserved(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn uri_decode(input: &str) -> EResult<Value> {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 3 > bytes.len() {
                return Err(EvalError::Type("malformed URI sequence".into()));
            }
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .map_err(|_| EvalError::Type("malformed URI sequence".into()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| EvalError::Type("malformed URI sequence".into()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map(Value::str)
        .map_err(|_| EvalError::Type("malformed UTF-8 in URI".into()))
}

fn parse_int(input: &str, radix: Option<f64>) -> f64 {
    let mut s = input.trim();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = match radix {
        Some(r) if r != 0.0 => {
            let r = r as u32;
            if !(2..=36).contains(&r) {
                return f64::NAN;
            }
            r
        }
        _ => 10,
    };
    if (radix == 16 || radix == 10) && (s.starts_with("0x") || s.starts_with("0X")) {
        s = &s[2..];
        radix = 16;
    }
    let digits: String = s
        .chars()
        .take_while(|c| c.is_digit(radix))
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix).expect("checked digit") as f64;
    }
    sign * value
}

fn parse_float(input: &str) -> f64 {
    let s = input.trim();
    let mut end = 0;
    let bytes = s.as_bytes();
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        let c = bytes[end] as char;
        let ok = c.is_ascii_digit()
            || (end == 0 && (c == '+' || c == '-'))
            || (c == '.' && !seen_dot && !seen_exp)
            || ((c == 'e' || c == 'E') && !seen_exp && end > 0)
            || ((c == '+' || c == '-') && end > 0 && matches!(bytes[end - 1] as char, 'e' | 'E'));
        if !ok {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        if c == 'e' || c == 'E' {
            seen_exp = true;
        }
        end += 1;
    }
    if s.starts_with("Infinity") || s.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if s.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

// ----------------------------------------------------------------------
// JSON
// ----------------------------------------------------------------------

fn json_stringify(value: &Value) -> Value {
    match to_json(value, 0) {
        Some(json) => Value::str(json.to_string()),
        None => Value::Undefined,
    }
}

fn to_json(value: &Value, depth: usize) -> Option<serde_json::Value> {
    if depth > 32 {
        return None;
    }
    Some(match value {
        Value::Undefined | Value::Function(_) | Value::Native(_) | Value::Method(_) => return None,
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.as_ref().clone()),
        Value::Array(items) => serde_json::Value::Array(
            items
                .borrow()
                .iter()
                .map(|v| to_json(v, depth + 1).unwrap_or(serde_json::Value::Null))
                .collect(),
        ),
        Value::Object(o) => {
            let mut map = serde_json::Map::new();
            for (k, v) in o.borrow().entries() {
                if let Some(j) = to_json(v, depth + 1) {
                    map.insert(k.clone(), j);
                }
            }
            serde_json::Value::Object(map)
        }
    })
}

fn json_parse(input: &str) -> EResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| EvalError::Type(format!("JSON.parse: {e}")))?;
    Ok(from_json(&parsed))
}

fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let obj = Value::object();
            if let Value::Object(o) = &obj {
                for (k, v) in map {
                    o.borrow_mut().set(k, from_json(v));
                }
            }
            obj
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atob_round_trips_btoa() {
        let encoded = match btoa("password=hackMe94!").unwrap() {
            Value::Str(s) => s.as_ref().clone(),
            other => panic!("expected string, got {other:?}"),
        };
        let decoded = atob(&encoded).unwrap();
        assert_eq!(to_string(&decoded), "password=hackMe94!");
    }

    #[test]
    fn atob_accepts_unpadded_input() {
        let decoded = atob("aGk").unwrap();
        assert_eq!(to_string(&decoded), "hi");
    }

    #[test]
    fn parse_int_follows_js_rules() {
        assert_eq!(parse_int("42px", None), 42.0);
        assert_eq!(parse_int("0x1b", None), 27.0);
        assert_eq!(parse_int("-7", None), -7.0);
        assert_eq!(parse_int("z", Some(36.0)), 35.0);
        assert!(parse_int("", None).is_nan());
    }

    #[test]
    fn escape_and_unescape_are_inverse() {
        let original = "a b%c\u{e9}\u{4e2d}";
        assert_eq!(js_unescape(&js_escape(original)), original);
    }

    #[test]
    fn radix_formatting() {
        assert_eq!(format_radix(255, 16), "ff");
        assert_eq!(format_radix(-8, 2), "-1000");
        assert_eq!(format_radix(35, 36), "z");
    }
}
