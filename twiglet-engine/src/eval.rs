//! Expression evaluation and statement execution.

use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::environment::Environment;
use crate::error::TemplateError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::parser::Node;
use crate::scope::Scope;
use crate::value::{Map, Value};

pub(crate) fn render_into(
    env: &Environment,
    nodes: &[Node],
    scope: &mut Scope<'_>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Raw(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = eval(env, expr, scope)?;
                let _ = write!(out, "{value}");
            }
            Node::If { branches, otherwise } => {
                let mut taken = None;
                for (condition, body) in branches {
                    if eval(env, condition, scope)?.is_truthy() {
                        taken = Some(body);
                        break;
                    }
                }
                render_into(env, taken.unwrap_or(otherwise), scope, out)?;
            }
            Node::For {
                key,
                value,
                iterable,
                body,
                otherwise,
            } => {
                let items = iteration_items(eval(env, iterable, scope)?)?;
                if items.is_empty() {
                    render_into(env, otherwise, scope, out)?;
                    continue;
                }
                let length = items.len();
                let mut inner = scope.child();
                for (index, (k, v)) in items.into_iter().enumerate() {
                    if let Some(key) = key {
                        inner.set(key.as_str(), k);
                    }
                    inner.set(value.as_str(), v);
                    inner.set("loop", loop_map(index, length));
                    render_into(env, body, &mut inner, out)?;
                }
            }
            Node::Set { name, value } => {
                let value = eval(env, value, scope)?;
                scope.set(name.as_str(), value);
            }
            Node::SetBlock { name, body } => {
                let mut captured = String::new();
                render_into(env, body, scope, &mut captured)?;
                scope.set(name.as_str(), Value::String(captured));
            }
            Node::Tag(tag) => {
                let rendered = tag.instance.render(env, scope, &tag.body)?;
                out.push_str(&rendered);
            }
        }
    }
    Ok(())
}

fn iteration_items(value: Value) -> Result<Vec<(Value, Value)>, TemplateError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::from(i), v))
            .collect()),
        Value::Map(map) => Ok(map.into_iter().map(|(k, v)| (Value::String(k), v)).collect()),
        other => Err(TemplateError::runtime(format!("cannot iterate over `{other}`"))),
    }
}

fn loop_map(index: usize, length: usize) -> Value {
    let mut map = Map::new();
    map.insert("index".into(), Value::from(index + 1));
    map.insert("index0".into(), Value::from(index));
    map.insert("first".into(), Value::Bool(index == 0));
    map.insert("last".into(), Value::Bool(index + 1 == length));
    map.insert("length".into(), Value::from(length));
    Value::Map(map)
}

pub(crate) fn eval(env: &Environment, expr: &Expr, scope: &Scope<'_>) -> Result<Value, TemplateError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => Ok(scope.get(name).cloned().unwrap_or_default()),
        Expr::Attr(target, name) => Ok(eval(env, target, scope)?.get_attr(name)),
        Expr::Index(target, key) => {
            let target = eval(env, target, scope)?;
            Ok(target.get_item(&eval(env, key, scope)?))
        }
        Expr::MethodCall { target, name, args } => {
            let target = eval(env, target, scope)?;
            let args = eval_all(env, args, scope)?;
            match &target {
                Value::Object(object) => object.call_method(name, &args),
                _ if args.is_empty() => Ok(target.get_attr(name)),
                _ => Err(TemplateError::runtime(format!("cannot call `{name}()` on `{target}`"))),
            }
        }
        Expr::Call { name, args } => {
            let args = eval_all(env, args, scope)?;
            env.call_function(name, &args)
        }
        Expr::Filter { target, name, args } => {
            let target = eval(env, target, scope)?;
            let args = eval_all(env, args, scope)?;
            env.apply_filter(name, &target, &args)
        }
        Expr::Test { target, name, negated } => {
            let result = test(env, target, name, scope)?;
            Ok(Value::Bool(result != *negated))
        }
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!eval(env, inner, scope)?.is_truthy())),
        Expr::Unary(UnaryOp::Neg, inner) => match eval(env, inner, scope)? {
            Value::Int(i) => Ok(i.checked_neg().map_or(Value::Float(-(i as f64)), Value::Int)),
            other => other
                .as_f64()
                .map(|f| Value::Float(-f))
                .ok_or_else(|| TemplateError::runtime(format!("cannot negate `{other}`"))),
        },
        Expr::Binary(BinaryOp::Or, left, right) => {
            if eval(env, left, scope)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(env, right, scope)?.is_truthy()))
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            if !eval(env, left, scope)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(env, right, scope)?.is_truthy()))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(env, left, scope)?;
            let right = eval(env, right, scope)?;
            binary(*op, &left, &right)
        }
        Expr::Ternary(condition, then, otherwise) => {
            if eval(env, condition, scope)?.is_truthy() {
                eval(env, then, scope)
            } else {
                eval(env, otherwise, scope)
            }
        }
        Expr::Array(items) => Ok(Value::Array(eval_all(env, items, scope)?)),
        Expr::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = eval(env, key, scope)?.to_string();
                map.insert(key, eval(env, value, scope)?);
            }
            Ok(Value::Map(map))
        }
    }
}

fn eval_all(env: &Environment, exprs: &[Expr], scope: &Scope<'_>) -> Result<Vec<Value>, TemplateError> {
    exprs.iter().map(|e| eval(env, e, scope)).collect()
}

fn test(env: &Environment, target: &Expr, name: &str, scope: &Scope<'_>) -> Result<bool, TemplateError> {
    if name == "defined" {
        return is_defined(env, target, scope);
    }
    let value = eval(env, target, scope)?;
    match name {
        "null" | "none" => Ok(value.is_null()),
        "empty" => Ok(value.is_empty()),
        "iterable" => Ok(matches!(value, Value::Array(_) | Value::Map(_))),
        "even" => Ok(value.as_i64().map(|i| i % 2 == 0).unwrap_or(false)),
        "odd" => Ok(value.as_i64().map(|i| i % 2 != 0).unwrap_or(false)),
        _ => Err(TemplateError::runtime(format!("unknown test `{name}`"))),
    }
}

fn is_defined(env: &Environment, target: &Expr, scope: &Scope<'_>) -> Result<bool, TemplateError> {
    let (base, key) = match target {
        Expr::Var(name) => return Ok(scope.contains(name)),
        Expr::Attr(base, name) => (base, Value::String(name.clone())),
        Expr::Index(base, key) => (base, eval(env, key, scope)?),
        other => return Ok(!eval(env, other, scope)?.is_null()),
    };
    if !is_defined(env, base, scope)? {
        return Ok(false);
    }
    Ok(match eval(env, base, scope)? {
        Value::Map(map) => map.contains_key(&key.to_string()),
        Value::Array(items) => key
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .map(|i| i < items.len())
            .unwrap_or(false),
        Value::Object(object) => object.get_attr(&key.to_string()).is_some(),
        _ => false,
    })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, TemplateError> {
    let ordered = |wanted: &[Ordering]| {
        Value::Bool(
            left.compare(right)
                .map(|o| wanted.contains(&o))
                .unwrap_or(false),
        )
    };
    Ok(match op {
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_eq(right)),
        BinaryOp::Lt => ordered(&[Ordering::Less]),
        BinaryOp::Gt => ordered(&[Ordering::Greater]),
        BinaryOp::Le => ordered(&[Ordering::Less, Ordering::Equal]),
        BinaryOp::Ge => ordered(&[Ordering::Greater, Ordering::Equal]),
        BinaryOp::In => Value::Bool(right.contains(left)),
        BinaryOp::NotIn => Value::Bool(!right.contains(left)),
        BinaryOp::Concat => Value::String(format!("{left}{right}")),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)?
        }
        BinaryOp::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
        BinaryOp::And => Value::Bool(left.is_truthy() && right.is_truthy()),
    })
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, TemplateError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Rem if *b == 0 => return Err(TemplateError::runtime("modulo by zero")),
            BinaryOp::Rem => a.checked_rem(*b),
            _ => None,
        };
        if let Some(result) = result {
            return Ok(Value::Int(result));
        }
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(TemplateError::runtime(format!(
            "unsupported operands `{left}` and `{right}`"
        )));
    };
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(TemplateError::runtime("division by zero")),
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}
