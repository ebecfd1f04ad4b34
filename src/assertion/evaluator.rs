use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::assertion::builtins::{call_builtin, call_method, is_builtin};
use crate::assertion::parser::{MAX_DEPTH, parse_assertion};
use crate::assertion::types::{
    AssertError, AssertionResult, BinaryOp, CompareOp, Expr, UnaryOp, Value,
};
use crate::http::ExecutionOutcome;

/// 求值递归上限，左结合的长运算链也受此约束
const MAX_EVAL_DEPTH: usize = MAX_DEPTH * 4;

/// 字符串或列表重复后的最大长度
const MAX_REPEAT_LEN: usize = 1 << 20;

/// 对一次执行结果求值断言
///
/// 求值错误不会向外传播，而是记录在结果的 `error` 字段中。
pub fn evaluate(expression: &str, outcome: &ExecutionOutcome) -> AssertionResult {
    evaluate_against(expression, &response_view(outcome))
}

/// 对一组断言求值，空白断言被跳过
pub fn evaluate_all(assertions: &[String], outcome: &ExecutionOutcome) -> Vec<AssertionResult> {
    let view = response_view(outcome);
    assertions
        .iter()
        .filter(|assertion| !assertion.trim().is_empty())
        .map(|assertion| evaluate_against(assertion, &view))
        .collect()
}

/// 对已构建的 `response` 视图求值
pub fn evaluate_against(expression: &str, response: &Value) -> AssertionResult {
    let result = parse_assertion(expression).and_then(|expr| {
        let mut evaluator = Evaluator { response, depth: 0 };
        evaluator.eval(&expr)
    });

    match result {
        Ok(value) => AssertionResult::from_bool(expression, value.is_truthy()),
        Err(e) => {
            debug!("Assertion '{}' failed to evaluate: {}", expression, e);
            AssertionResult::error(expression, e)
        }
    }
}

/// 构建断言中可见的 `response` 对象
pub fn response_view(outcome: &ExecutionOutcome) -> Value {
    let optional_int = |value: Option<i64>| value.map(Value::Int).unwrap_or(Value::Null);

    let headers = outcome
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
        .collect();

    let mut fields = BTreeMap::new();
    fields.insert("code".to_string(), optional_int(outcome.code.map(i64::from)));
    fields.insert("headers".to_string(), Value::Map(headers));
    fields.insert("body".to_string(), Value::Str(outcome.body.clone()));
    fields.insert("stdout".to_string(), Value::Str(outcome.stdout.clone()));
    fields.insert("stderr".to_string(), Value::Str(outcome.stderr.clone()));
    fields.insert("raw".to_string(), Value::Str(outcome.raw.clone()));
    fields.insert(
        "returncode".to_string(),
        optional_int(outcome.returncode.map(i64::from)),
    );
    fields.insert("timed_out".to_string(), Value::Bool(outcome.timed_out));
    fields.insert(
        "elapsed_ms".to_string(),
        Value::Int(i64::try_from(outcome.elapsed_ms).unwrap_or(i64::MAX)),
    );

    Value::Object {
        name: "response",
        fields,
    }
}

struct Evaluator<'a> {
    response: &'a Value,
    depth: usize,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> Result<Value, AssertError> {
        self.depth += 1;
        if self.depth > MAX_EVAL_DEPTH {
            return Err(AssertError::TooDeep(MAX_EVAL_DEPTH));
        }
        let value = self.eval_inner(expr);
        self.depth -= 1;
        value
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, AssertError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Name(name) => {
                if name == "response" {
                    Ok(self.response.clone())
                } else if is_builtin(name) {
                    Err(AssertError::TypeMismatch(format!(
                        "built-in '{}' can only be called",
                        name
                    )))
                } else {
                    Err(AssertError::UndefinedName(name.clone()))
                }
            }

            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),

            Expr::Attribute(object, attribute) => {
                // response.x 直接取字段，避免复制整个视图
                if let Expr::Name(name) = object.as_ref()
                    && name == "response"
                {
                    return get_attribute(self.response, attribute);
                }
                let object = self.eval(object)?;
                get_attribute(&object, attribute)
            }

            Expr::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                get_index(&object, &index)
            }

            Expr::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                match func.as_ref() {
                    Expr::Name(name) if is_builtin(name) => call_builtin(name, args),
                    Expr::Name(name) if name != "response" => {
                        Err(AssertError::UndefinedName(name.clone()))
                    }
                    Expr::Attribute(receiver, method) => {
                        let receiver = self.eval(receiver)?;
                        call_method(receiver, method, args)
                    }
                    other => {
                        let value = self.eval(other)?;
                        Err(AssertError::TypeMismatch(format!(
                            "'{}' object is not callable",
                            value.type_name()
                        )))
                    }
                }
            }

            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                unary(*op, &value)
            }

            Expr::Binary(left, op, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }

            // and/or 返回操作数本身，和 Python 一致
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }

            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }

            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
        }
    }
}

fn get_attribute(object: &Value, attribute: &str) -> Result<Value, AssertError> {
    let missing = || AssertError::MissingAttribute {
        object: object.type_name().to_string(),
        attribute: attribute.to_string(),
    };

    match object {
        Value::Object { fields, .. } => fields.get(attribute).cloned().ok_or_else(missing),
        _ => Err(missing()),
    }
}

fn get_index(object: &Value, index: &Value) -> Result<Value, AssertError> {
    match (object, index) {
        (Value::List(items), _) if index.as_int().is_some() => {
            let i = index.as_int().unwrap_or_default();
            resolve_position(i, items.len())
                .map(|pos| items[pos].clone())
                .ok_or(AssertError::IndexOutOfRange(i))
        }
        (Value::Str(s), _) if index.as_int().is_some() => {
            let i = index.as_int().unwrap_or_default();
            let chars: Vec<char> = s.chars().collect();
            resolve_position(i, chars.len())
                .map(|pos| Value::Str(chars[pos].to_string()))
                .ok_or(AssertError::IndexOutOfRange(i))
        }
        (Value::Map(map), Value::Str(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| AssertError::KeyNotFound(format!("'{}'", key))),
        (Value::Map(_), other) => Err(AssertError::KeyNotFound(other.to_string())),
        (Value::List(_) | Value::Str(_), other) => Err(AssertError::TypeMismatch(format!(
            "{} indices must be integers, not {}",
            object.type_name(),
            other.type_name()
        ))),
        _ => Err(AssertError::TypeMismatch(format!(
            "'{}' object is not subscriptable",
            object.type_name()
        ))),
    }
}

/// 支持负数下标
fn resolve_position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if index < 0 { index + len } else { index };
    if (0..len).contains(&pos) {
        usize::try_from(pos).ok()
    } else {
        None
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, AssertError> {
    let bad_operand = |symbol: &str| {
        AssertError::TypeMismatch(format!(
            "bad operand type for unary {}: '{}'",
            symbol,
            value.type_name()
        ))
    };

    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => {
                let i = value.as_int().ok_or_else(|| bad_operand("-"))?;
                i.checked_neg().map(Value::Int).ok_or_else(overflow)
            }
        },
        UnaryOp::Pos => match value {
            Value::Float(f) => Ok(Value::Float(*f)),
            _ => value.as_int().map(Value::Int).ok_or_else(|| bad_operand("+")),
        },
    }
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, AssertError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), n) | (BinaryOp::Mul, n, Value::Str(s))
            if n.as_int().is_some() =>
        {
            let count = repeat_count(n, s.chars().count())?;
            Ok(Value::Str(s.repeat(count)))
        }
        (BinaryOp::Mul, Value::List(items), n) | (BinaryOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let count = repeat_count(n, items.len())?;
            Ok(Value::List(
                std::iter::repeat_n(items.iter().cloned(), count)
                    .flatten()
                    .collect(),
            ))
        }
        _ => numeric(op, left, right),
    }
}

fn repeat_count(n: &Value, unit_len: usize) -> Result<usize, AssertError> {
    let count = usize::try_from(n.as_int().unwrap_or_default().max(0)).unwrap_or(0);
    if unit_len == 0 {
        return Ok(0);
    }
    if count.saturating_mul(unit_len) > MAX_REPEAT_LEN {
        return Err(AssertError::InvalidValue(
            "repetition result too large".to_string(),
        ));
    }
    Ok(count)
}

fn numeric(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, AssertError> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_arith(op, a, b);
    }

    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => float_arith(op, a, b),
        _ => Err(AssertError::TypeMismatch(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.as_str(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn overflow() -> AssertError {
    AssertError::InvalidValue("integer overflow".to_string())
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, AssertError> {
    let value = match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Div => {
            if b == 0 {
                return Err(AssertError::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(AssertError::DivisionByZero);
            }
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            // 向负无穷取整
            if a % b != 0 && ((a < 0) != (b < 0)) {
                quotient - 1
            } else {
                quotient
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(AssertError::DivisionByZero);
            }
            let remainder = a.checked_rem(b).ok_or_else(overflow)?;
            // 余数与除数同号
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                remainder + b
            } else {
                remainder
            }
        }
    };
    Ok(Value::Int(value))
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, AssertError> {
    if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
        return Err(AssertError::DivisionByZero);
    }

    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                remainder + b
            } else {
                remainder
            }
        }
    };
    Ok(Value::Float(value))
}

pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        (Value::Object { .. }, Value::Object { .. }) => left == right,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// 有序比较；NaN 参与比较时返回 None
pub(crate) fn order(
    symbol: &str,
    left: &Value,
    right: &Value,
) -> Result<Option<Ordering>, AssertError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if values_equal(x, y) {
                    continue;
                }
                return order(symbol, x, y);
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(AssertError::TypeMismatch(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                symbol,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, AssertError> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(AssertError::TypeMismatch(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::List(items), _) => Ok(items.iter().any(|x| values_equal(x, item))),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        _ => Err(AssertError::TypeMismatch(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, AssertError> {
    let symbol = op.as_str();
    Ok(match op {
        CompareOp::Equal => values_equal(left, right),
        CompareOp::NotEqual => !values_equal(left, right),
        CompareOp::Less => order(symbol, left, right)? == Some(Ordering::Less),
        CompareOp::LessOrEqual => matches!(
            order(symbol, left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Greater => order(symbol, left, right)? == Some(Ordering::Greater),
        CompareOp::GreaterOrEqual => matches!(
            order(symbol, left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
        CompareOp::Is => left.type_name() == right.type_name() && values_equal(left, right),
        CompareOp::IsNot => !(left.type_name() == right.type_name() && values_equal(left, right)),
    })
}
