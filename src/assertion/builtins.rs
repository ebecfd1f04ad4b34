use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::assertion::evaluator::{binary, order, values_equal};
use crate::assertion::types::{AssertError, BinaryOp, Value};

/// 断言中可调用的内置函数白名单
pub const BUILTINS: &[&str] = &[
    "len", "str", "int", "float", "bool", "list", "dict", "set", "max", "min", "sum", "abs",
    "round", "all", "any", "json",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), AssertError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{}", min)
    } else {
        format!("{} to {}", min, max)
    };
    Err(AssertError::TypeMismatch(format!(
        "{}() takes {} argument(s) ({} given)",
        name,
        expected,
        args.len()
    )))
}

/// 可迭代对象展开为列表：字符串按字符，字典按键
fn iterate(value: &Value) -> Result<Vec<Value>, AssertError> {
    match value {
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::List(items) => Ok(items.clone()),
        Value::Map(map) => Ok(map.keys().cloned().map(Value::Str).collect()),
        other => Err(AssertError::TypeMismatch(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

/// 调用内置函数
pub fn call_builtin(name: &str, mut args: Vec<Value>) -> Result<Value, AssertError> {
    match name {
        "len" => {
            arity(name, &args, 1, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(AssertError::TypeMismatch(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        }

        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(
                args.first().map(|v| v.to_string()).unwrap_or_default(),
            ))
        }

        "int" => {
            arity(name, &args, 0, 1)?;
            let Some(value) = args.first() else {
                return Ok(Value::Int(0));
            };
            to_int(value).map(Value::Int)
        }

        "float" => {
            arity(name, &args, 0, 1)?;
            let Some(value) = args.first() else {
                return Ok(Value::Float(0.0));
            };
            to_float(value).map(Value::Float)
        }

        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }

        "list" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(value) => iterate(value).map(Value::List),
                None => Ok(Value::List(Vec::new())),
            }
        }

        "dict" => {
            arity(name, &args, 0, 1)?;
            match args.pop() {
                None => Ok(Value::Map(BTreeMap::new())),
                Some(map @ Value::Map(_)) => Ok(map),
                Some(other) => Err(AssertError::TypeMismatch(format!(
                    "cannot convert '{}' to dict",
                    other.type_name()
                ))),
            }
        }

        // 没有独立的集合类型，返回去重后的列表（保留首次出现顺序）
        "set" => {
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(value) => iterate(value)?,
                None => Vec::new(),
            };
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.iter().any(|seen| values_equal(seen, &item)) {
                    unique.push(item);
                }
            }
            Ok(Value::List(unique))
        }

        "max" | "min" => {
            arity(name, &args, 1, usize::MAX)?;
            let items = if args.len() == 1 {
                iterate(&args[0])?
            } else {
                args
            };
            let wanted = if name == "max" {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let symbol = if name == "max" { ">" } else { "<" };

            let mut iter = items.into_iter();
            let mut best = iter.next().ok_or_else(|| {
                AssertError::InvalidValue(format!("{}() arg is an empty sequence", name))
            })?;
            for item in iter {
                if order(symbol, &item, &best)? == Some(wanted) {
                    best = item;
                }
            }
            Ok(best)
        }

        "sum" => {
            arity(name, &args, 1, 2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            if let Value::Str(_) = start {
                return Err(AssertError::TypeMismatch(
                    "sum() can't sum strings".to_string(),
                ));
            }
            iterate(&args[0])?
                .iter()
                .try_fold(start, |total, item| binary(BinaryOp::Add, &total, item))
        }

        "abs" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => {
                    let i = other.as_int().ok_or_else(|| {
                        AssertError::TypeMismatch(format!(
                            "bad operand type for abs(): '{}'",
                            other.type_name()
                        ))
                    })?;
                    i.checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| AssertError::InvalidValue("integer overflow".to_string()))
                }
            }
        }

        "round" => {
            arity(name, &args, 1, 2)?;
            round(&args[0], args.get(1))
        }

        "all" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(iterate(&args[0])?.iter().all(Value::is_truthy)))
        }

        "any" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(iterate(&args[0])?.iter().any(Value::is_truthy)))
        }

        "json" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(text) => {
                    let parsed: serde_json::Value = serde_json::from_str(text)?;
                    Ok(Value::from(parsed))
                }
                other => Err(AssertError::TypeMismatch(format!(
                    "json() argument must be str, not {}",
                    other.type_name()
                ))),
            }
        }

        other => Err(AssertError::UndefinedName(other.to_string())),
    }
}

fn to_int(value: &Value) -> Result<i64, AssertError> {
    match value {
        Value::Float(f) => {
            if f.is_finite() && f.abs() < 9.2e18 {
                Ok(f.trunc() as i64)
            } else {
                Err(AssertError::InvalidValue(format!(
                    "cannot convert float {} to integer",
                    f
                )))
            }
        }
        Value::Str(s) => s.trim().parse().map_err(|_| {
            AssertError::InvalidValue(format!(
                "invalid literal for int() with base 10: '{}'",
                s
            ))
        }),
        other => other.as_int().ok_or_else(|| {
            AssertError::TypeMismatch(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &Value) -> Result<f64, AssertError> {
    match value {
        Value::Str(s) => s.trim().parse().map_err(|_| {
            AssertError::InvalidValue(format!("could not convert string to float: '{}'", s))
        }),
        other => other.as_number().ok_or_else(|| {
            AssertError::TypeMismatch(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

/// 银行家舍入，与 Python 的 round 一致
fn round(value: &Value, digits: Option<&Value>) -> Result<Value, AssertError> {
    let digits = match digits {
        None | Some(Value::Null) => None,
        Some(d) => Some(d.as_int().ok_or_else(|| {
            AssertError::TypeMismatch(format!(
                "'{}' object cannot be interpreted as an integer",
                d.type_name()
            ))
        })?),
    };

    match (value, digits) {
        (Value::Float(f), None) => to_int(&Value::Float(f.round_ties_even())).map(Value::Int),
        (Value::Float(f), Some(n)) => {
            let factor = 10f64.powi(n.clamp(-308, 308) as i32);
            Ok(Value::Float((f * factor).round_ties_even() / factor))
        }
        (other, _) => other.as_int().map(Value::Int).ok_or_else(|| {
            AssertError::TypeMismatch(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            ))
        }),
    }
}

/// 调用字符串或字典的方法
pub fn call_method(receiver: Value, method: &str, args: Vec<Value>) -> Result<Value, AssertError> {
    match (&receiver, method) {
        (Value::Map(map), "get") => {
            arity(method, &args, 1, 2)?;
            let found = match &args[0] {
                Value::Str(key) => map.get(key).cloned(),
                _ => None,
            };
            Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Null)))
        }
        (Value::Map(map), "keys") => {
            arity(method, &args, 0, 0)?;
            Ok(Value::List(map.keys().cloned().map(Value::Str).collect()))
        }
        (Value::Map(map), "values") => {
            arity(method, &args, 0, 0)?;
            Ok(Value::List(map.values().cloned().collect()))
        }

        (Value::Str(s), "startswith" | "endswith") => {
            arity(method, &args, 1, 1)?;
            let Value::Str(affix) = &args[0] else {
                return Err(AssertError::TypeMismatch(format!(
                    "{} arg must be str, not {}",
                    method,
                    args[0].type_name()
                )));
            };
            Ok(Value::Bool(if method == "startswith" {
                s.starts_with(affix.as_str())
            } else {
                s.ends_with(affix.as_str())
            }))
        }
        (Value::Str(s), "lower") => {
            arity(method, &args, 0, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        (Value::Str(s), "upper") => {
            arity(method, &args, 0, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        (Value::Str(s), "strip") => {
            arity(method, &args, 0, 1)?;
            match args.first() {
                None | Some(Value::Null) => Ok(Value::Str(s.trim().to_string())),
                Some(Value::Str(chars)) => Ok(Value::Str(
                    s.trim_matches(|c| chars.contains(c)).to_string(),
                )),
                Some(other) => Err(AssertError::TypeMismatch(format!(
                    "strip arg must be None or str, not {}",
                    other.type_name()
                ))),
            }
        }
        (Value::Str(s), "split") => {
            arity(method, &args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Null) => s
                    .split_whitespace()
                    .map(|part| Value::Str(part.to_string()))
                    .collect(),
                Some(Value::Str(sep)) if sep.is_empty() => {
                    return Err(AssertError::InvalidValue("empty separator".to_string()));
                }
                Some(Value::Str(sep)) => s
                    .split(sep.as_str())
                    .map(|part| Value::Str(part.to_string()))
                    .collect(),
                Some(other) => {
                    return Err(AssertError::TypeMismatch(format!(
                        "must be str or None, not {}",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::List(parts))
        }

        _ => Err(AssertError::MissingAttribute {
            object: receiver.type_name().to_string(),
            attribute: method.to_string(),
        }),
    }
}
