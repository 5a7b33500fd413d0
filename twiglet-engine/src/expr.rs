//! Expression AST and its recursive-descent parser.
//!
//! Precedence, loosest first:
//!
//! | Level | Operators                                   |
//! |-------|---------------------------------------------|
//! | 1     | `a ? b : c`                                 |
//! | 2     | `or`                                        |
//! | 3     | `and`                                       |
//! | 4     | `not`                                       |
//! | 5     | `== != < > <= >= in not-in is`              |
//! | 6     | `~`                                         |
//! | 7     | `+ -`                                       |
//! | 8     | `* / %`                                     |
//! | 9     | unary `-`                                   |
//! | 10    | postfix `.name` `[expr]` `(args)` `\|filter` |

use crate::error::SyntaxError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    MethodCall {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Filter {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Test {
        target: Box<Expr>,
        name: String,
        negated: bool,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
}

impl Expr {
    /// Compile `source` into an expression.
    pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
        let tokens = tokenize(source)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.ternary()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(SyntaxError::new(format!(
                "unexpected `{tok}` in expression `{source}`"
            ))),
        }
    }

    /// The variable name when the expression is a single variable reference.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var(name) => Some(name),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Punct(&'static str),
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s) => f.write_str(s),
            Tok::Str(s) => write!(f, "{s:?}"),
            Tok::Int(i) => write!(f, "{i}"),
            Tok::Float(x) => write!(f, "{x}"),
            Tok::Punct(p) => f.write_str(p),
        }
    }
}

const PUNCTS: &[&str] = &[
    "==", "!=", "<=", ">=", "<", ">", "~", "+", "-", "*", "/", "%", "|", ".", "(", ")", "[", "]",
    "{", "}", ",", ":", "?",
];

fn tokenize(source: &str) -> Result<Vec<Tok>, SyntaxError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '"' || c == '\'' {
            let (s, next) = read_string(&chars, i)?;
            tokens.push(Tok::Str(s));
            i = next;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            let is_float = i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit();
            if is_float {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            if is_float {
                let value = text
                    .parse()
                    .map_err(|_| SyntaxError::new(format!("invalid number `{text}`")))?;
                tokens.push(Tok::Float(value));
            } else {
                let value = text
                    .parse()
                    .map_err(|_| SyntaxError::new(format!("invalid number `{text}`")))?;
                tokens.push(Tok::Int(value));
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Tok::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let punct = PUNCTS
                .iter()
                .find(|p| rest.starts_with(**p))
                .ok_or_else(|| SyntaxError::new(format!("unexpected character `{c}`")))?;
            tokens.push(Tok::Punct(punct));
            i += punct.len();
        }
    }
    Ok(tokens)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), SyntaxError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(SyntaxError::new("unterminated string literal"))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(q)) if *q == p)
    }

    fn at_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(w)) if w == word)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), SyntaxError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(SyntaxError::new(match self.peek() {
                Some(tok) => format!("expected `{p}`, found `{tok}`"),
                None => format!("expected `{p}`, found end of expression"),
            }))
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.next() {
            Some(Tok::Ident(name)) => Ok(name),
            Some(tok) => Err(SyntaxError::new(format!("expected a name, found `{tok}`"))),
            None => Err(SyntaxError::new("expected a name, found end of expression")),
        }
    }

    fn ternary(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.or()?;
        if !self.eat_punct("?") {
            return Ok(cond);
        }
        let then = self.ternary()?;
        self.expect_punct(":")?;
        let otherwise = self.ternary()?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.and()?;
        while self.at_ident("or") {
            self.pos += 1;
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.not()?;
        while self.at_ident("and") {
            self.pos += 1;
            let right = self.not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, SyntaxError> {
        if self.at_ident("not") {
            self.pos += 1;
            let inner = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.concat()?;
        let op = match self.peek() {
            Some(Tok::Punct("==")) => BinaryOp::Eq,
            Some(Tok::Punct("!=")) => BinaryOp::Ne,
            Some(Tok::Punct("<")) => BinaryOp::Lt,
            Some(Tok::Punct(">")) => BinaryOp::Gt,
            Some(Tok::Punct("<=")) => BinaryOp::Le,
            Some(Tok::Punct(">=")) => BinaryOp::Ge,
            Some(Tok::Ident(w)) if w == "in" => BinaryOp::In,
            Some(Tok::Ident(w))
                if w == "not" && matches!(self.peek_at(1), Some(Tok::Ident(n)) if n == "in") =>
            {
                self.pos += 1;
                BinaryOp::NotIn
            }
            Some(Tok::Ident(w)) if w == "is" => return self.test(left),
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.concat()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn test(&mut self, target: Expr) -> Result<Expr, SyntaxError> {
        self.pos += 1;
        let negated = self.at_ident("not");
        if negated {
            self.pos += 1;
        }
        let name = self.ident()?;
        Ok(Expr::Test {
            target: Box::new(target),
            name,
            negated,
        })
    }

    fn concat(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.additive()?;
        while self.eat_punct("~") {
            let right = self.additive()?;
            left = Expr::Binary(BinaryOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.eat_punct("+") {
                BinaryOp::Add
            } else if self.eat_punct("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_punct("*") {
                BinaryOp::Mul
            } else if self.eat_punct("/") {
                BinaryOp::Div
            } else if self.eat_punct("%") {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_punct("-") {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let name = match self.next() {
                    Some(Tok::Ident(name)) => name,
                    Some(Tok::Int(i)) => i.to_string(),
                    _ => return Err(SyntaxError::new("expected attribute name after `.`")),
                };
                if self.eat_punct("(") {
                    let args = self.args(")")?;
                    expr = Expr::MethodCall {
                        target: Box::new(expr),
                        name,
                        args,
                    };
                } else {
                    expr = Expr::Attr(Box::new(expr), name);
                }
            } else if self.eat_punct("[") {
                let key = self.ternary()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(key));
            } else if self.eat_punct("|") {
                let name = self.ident()?;
                let args = if self.eat_punct("(") {
                    self.args(")")?
                } else {
                    Vec::new()
                };
                expr = Expr::Filter {
                    target: Box::new(expr),
                    name,
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to the closing `close` punctuation.
    fn args(&mut self, close: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        while !self.eat_punct(close) {
            if !args.is_empty() {
                self.expect_punct(",")?;
                if self.eat_punct(close) {
                    break;
                }
            }
            args.push(self.ternary()?);
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.next() {
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Tok::Float(x)) => Ok(Expr::Literal(Value::Float(x))),
            Some(Tok::Ident(word)) => match word.as_str() {
                "true" | "TRUE" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "FALSE" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "none" | "NULL" => Ok(Expr::Literal(Value::Null)),
                _ if self.eat_punct("(") => {
                    let args = self.args(")")?;
                    Ok(Expr::Call { name: word, args })
                }
                _ => Ok(Expr::Var(word)),
            },
            Some(Tok::Punct("(")) => {
                let inner = self.ternary()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(Tok::Punct("[")) => Ok(Expr::Array(self.args("]")?)),
            Some(Tok::Punct("{")) => self.map_literal(),
            Some(tok) => Err(SyntaxError::new(format!("unexpected `{tok}`"))),
            None => Err(SyntaxError::new("unexpected end of expression")),
        }
    }

    fn map_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            if !entries.is_empty() {
                self.expect_punct(",")?;
                if self.eat_punct("}") {
                    break;
                }
            }
            let key = match self.next() {
                Some(Tok::Ident(name)) | Some(Tok::Str(name)) => Expr::Literal(Value::String(name)),
                Some(Tok::Int(i)) => Expr::Literal(Value::String(i.to_string())),
                Some(Tok::Punct("(")) => {
                    let key = self.ternary()?;
                    self.expect_punct(")")?;
                    key
                }
                _ => return Err(SyntaxError::new("expected a mapping key")),
            };
            self.expect_punct(":")?;
            let value = self.ternary()?;
            entries.push((key, value));
        }
        Ok(Expr::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_variable_is_recognised() {
        assert_eq!(Expr::parse("name").unwrap().as_var(), Some("name"));
        assert_eq!(Expr::parse("user.name").unwrap().as_var(), None);
    }

    #[test]
    fn map_literal_with_nested_values() {
        let expr = Expr::parse("{ label: 'Go', 'data-x': [1, 2], attributes: {class: 'a'} }").unwrap();
        match expr {
            Expr::Map(entries) => assert_eq!(entries.len(), 3),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn filter_binds_tighter_than_concat() {
        let expr = Expr::parse("'a' ~ b|upper").unwrap();
        match expr {
            Expr::Binary(BinaryOp::Concat, _, right) => {
                assert!(matches!(*right, Expr::Filter { .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn not_in_and_tests() {
        assert!(matches!(
            Expr::parse("a not in b").unwrap(),
            Expr::Binary(BinaryOp::NotIn, _, _)
        ));
        assert!(matches!(
            Expr::parse("a is not defined").unwrap(),
            Expr::Test { negated: true, .. }
        ));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = Expr::parse("a b").unwrap_err();
        assert!(err.message.contains("unexpected `b`"));
        assert!(Expr::parse("'open").is_err());
        assert!(Expr::parse("{a 1}").is_err());
    }
}
