/// 断言模块 - 在受限解释器中对响应求值
mod builtins;
mod evaluator;
mod lexer;
mod parser;
mod types;

pub use builtins::BUILTINS;
pub use evaluator::{evaluate, evaluate_against, evaluate_all, response_view};
pub use parser::{MAX_DEPTH, parse_assertion};
pub use types::{AssertError, AssertionResult, BinaryOp, CompareOp, Expr, UnaryOp, Value};
