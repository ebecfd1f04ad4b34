use crate::assertion::lexer::{Token, tokenize};
use crate::assertion::types::{AssertError, BinaryOp, CompareOp, Expr, UnaryOp, Value};

/// 表达式最大嵌套深度
pub const MAX_DEPTH: usize = 64;

/// 解析断言表达式
///
/// 支持的写法：
/// - `response.code == 200`
/// - `200 <= response.code < 300`
/// - `'application/json' in response.headers.get('Content-Type', '')`
/// - `json(response.body)['items'][0]['id'] > 0 and not response.timed_out`
/// - `len(response.body) > 0`
pub fn parse_assertion(input: &str) -> Result<Expr, AssertError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(AssertError::InvalidSyntax("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expr()?;

    if let Some(token) = parser.peek() {
        return Err(AssertError::InvalidSyntax(format!(
            "unexpected token {}",
            describe(token)
        )));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), AssertError> {
        if self.eat_punct(punct) {
            return Ok(());
        }
        Err(AssertError::InvalidSyntax(match self.peek() {
            Some(token) => format!("expected '{}', found {}", punct, describe(token)),
            None => format!("expected '{}', found end of expression", punct),
        }))
    }

    fn enter(&mut self) -> Result<(), AssertError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(AssertError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// 左结合链每多一个运算符，生成的树就深一层
    fn link(&mut self, links: &mut usize) -> Result<(), AssertError> {
        *links += 1;
        self.enter()
    }

    fn unlink(&mut self, links: usize) {
        self.depth -= links;
    }

    fn parse_expr(&mut self) -> Result<Expr, AssertError> {
        self.enter()?;
        let expr = self.parse_or();
        self.leave();
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, AssertError> {
        let mut left = self.parse_and()?;
        let mut links = 0;
        while self.eat_keyword("or") {
            self.link(&mut links)?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, AssertError> {
        let mut left = self.parse_not()?;
        let mut links = 0;
        while self.eat_keyword("and") {
            self.link(&mut links)?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, AssertError> {
        if self.eat_keyword("not") {
            self.enter()?;
            let operand = self.parse_not();
            self.leave();
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, AssertError> {
        let first = self.parse_arith()?;
        let mut rest = Vec::new();

        while let Some(op) = self.parse_compare_op() {
            rest.push((op, self.parse_arith()?));
        }

        if rest.is_empty() {
            return Ok(first);
        }
        Ok(Expr::Compare {
            first: Box::new(first),
            rest,
        })
    }

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        let token = self.peek()?.clone();
        let op = match &token {
            Token::Punct("==") => CompareOp::Equal,
            Token::Punct("!=") => CompareOp::NotEqual,
            Token::Punct("<") => CompareOp::Less,
            Token::Punct("<=") => CompareOp::LessOrEqual,
            Token::Punct(">") => CompareOp::Greater,
            Token::Punct(">=") => CompareOp::GreaterOrEqual,
            Token::Ident(name) if name == "in" => CompareOp::In,
            Token::Ident(name) if name == "is" => {
                self.pos += 1;
                return Some(if self.eat_keyword("not") {
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                });
            }
            Token::Ident(name)
                if name == "not"
                    && matches!(self.peek_at(1), Some(Token::Ident(next)) if next == "in") =>
            {
                self.pos += 2;
                return Some(CompareOp::NotIn);
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_arith(&mut self) -> Result<Expr, AssertError> {
        let mut left = self.parse_term()?;
        let mut links = 0;
        loop {
            let op = if self.eat_punct("+") {
                BinaryOp::Add
            } else if self.eat_punct("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.link(&mut links)?;
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, AssertError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = if self.eat_punct("*") {
                BinaryOp::Mul
            } else if self.eat_punct("//") {
                BinaryOp::FloorDiv
            } else if self.eat_punct("/") {
                BinaryOp::Div
            } else if self.eat_punct("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            self.link(&mut links)?;
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, AssertError> {
        let op = if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Pos
        } else {
            return self.parse_postfix();
        };

        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, AssertError> {
        let mut expr = self.parse_atom()?;
        let mut links = 0;

        loop {
            if self.eat_punct(".") {
                self.link(&mut links)?;
                match self.advance() {
                    Some(Token::Ident(name)) => {
                        expr = Expr::Attribute(Box::new(expr), name);
                    }
                    Some(token) => {
                        return Err(AssertError::InvalidSyntax(format!(
                            "expected attribute name, found {}",
                            describe(&token)
                        )));
                    }
                    None => {
                        return Err(AssertError::InvalidSyntax(
                            "expected attribute name, found end of expression".to_string(),
                        ));
                    }
                }
            } else if self.eat_punct("[") {
                self.link(&mut links)?;
                let index = self.parse_expr()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat_punct("(") {
                self.link(&mut links)?;
                let args = self.parse_sequence(")")?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else {
                self.unlink(links);
                return Ok(expr);
            }
        }
    }

    /// 解析逗号分隔的表达式序列，允许末尾逗号
    fn parse_sequence(&mut self, close: &str) -> Result<Vec<Expr>, AssertError> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.parse_expr()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr, AssertError> {
        let token = self.advance().ok_or_else(|| {
            AssertError::InvalidSyntax("unexpected end of expression".to_string())
        })?;

        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Ident(name) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(Value::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(Value::Bool(false))),
                "None" | "null" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" | "in" | "is" => Err(AssertError::InvalidSyntax(format!(
                    "unexpected keyword '{}'",
                    name
                ))),
                _ => Ok(Expr::Name(name)),
            },
            Token::Punct("(") => {
                let expr = self.parse_expr()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Token::Punct("[") => {
                self.enter()?;
                let items = self.parse_sequence("]");
                self.leave();
                Ok(Expr::List(items?))
            }
            Token::Punct(p) => Err(AssertError::InvalidSyntax(format!(
                "unexpected token '{}'",
                p
            ))),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(i) => format!("number {}", i),
        Token::Float(f) => format!("number {}", f),
        Token::Str(s) => format!("string '{}'", s),
        Token::Ident(name) => format!("'{}'", name),
        Token::Punct(p) => format!("'{}'", p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn test_parse_attribute_comparison() {
        let expr = parse_assertion("response.code == 200").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                first: Box::new(Expr::Attribute(name("response"), "code".to_string())),
                rest: vec![(CompareOp::Equal, Expr::Literal(Value::Int(200)))],
            }
        );
    }

    #[test]
    fn test_parse_chained_comparison() {
        let expr = parse_assertion("200 <= response.code < 300").unwrap();
        let Expr::Compare { rest, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].0, CompareOp::LessOrEqual);
        assert_eq!(rest[1].0, CompareOp::Less);
    }

    #[test]
    fn test_parse_not_in_and_is_not() {
        let Expr::Compare { rest, .. } = parse_assertion("'x' not in response.body").unwrap()
        else {
            panic!("expected comparison");
        };
        assert_eq!(rest[0].0, CompareOp::NotIn);

        let Expr::Compare { rest, .. } = parse_assertion("response.code is not None").unwrap()
        else {
            panic!("expected comparison");
        };
        assert_eq!(rest[0].0, CompareOp::IsNot);
    }

    #[test]
    fn test_parse_precedence() {
        // not 绑定比 and 紧，and 比 or 紧
        let expr = parse_assertion("not a or b and c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::Unary(UnaryOp::Not, name("a"))),
                Box::new(Expr::And(name("b"), name("c"))),
            )
        );

        let expr = parse_assertion("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(Expr::Literal(Value::Int(1))),
                BinaryOp::Add,
                Box::new(Expr::Binary(
                    Box::new(Expr::Literal(Value::Int(2))),
                    BinaryOp::Mul,
                    Box::new(Expr::Literal(Value::Int(3))),
                )),
            )
        );
    }

    #[test]
    fn test_parse_call_and_index() {
        let expr = parse_assertion("len(json(response.body)['items'],)").unwrap();
        let Expr::Call { func, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(func, name("len"));
        assert_eq!(args.len(), 1);
        assert!(matches!(args[0], Expr::Index(_, _)));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            parse_assertion("[1, 'a', None, true]").unwrap(),
            Expr::List(vec![
                Expr::Literal(Value::Int(1)),
                Expr::Literal(Value::Str("a".to_string())),
                Expr::Literal(Value::Null),
                Expr::Literal(Value::Bool(true)),
            ])
        );
        assert_eq!(parse_assertion("[]").unwrap(), Expr::List(vec![]));
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "   ", "response.", "1 +", "(1", "[1, 2", "a b", "== 1", "and"] {
            assert!(
                matches!(parse_assertion(input), Err(AssertError::InvalidSyntax(_))),
                "expected syntax error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_assertion(&deep), Err(AssertError::TooDeep(_))));

        let negations = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_assertion(&negations),
            Err(AssertError::TooDeep(_))
        ));

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_assertion(&shallow).is_ok());
    }

    #[test]
    fn test_parse_long_chains_limited() {
        for separator in [" + ", " * ", " and ", " or "] {
            let chain = vec!["1"; 300_000].join(separator);
            assert!(
                matches!(parse_assertion(&chain), Err(AssertError::TooDeep(_))),
                "expected depth error for chain joined by {:?}",
                separator
            );
        }

        let attributes = format!("response{}", ".body".repeat(300_000));
        assert!(matches!(
            parse_assertion(&attributes),
            Err(AssertError::TooDeep(_))
        ));

        // 链结束后深度恢复，短链可以连续出现
        let short = vec!["1 + 1 + 1"; 20].join(" and ");
        assert!(parse_assertion(&short).is_ok());
    }
}
