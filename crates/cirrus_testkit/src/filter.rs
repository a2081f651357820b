//! Evaluator for the backend's filter grammar.
//!
//! Supports what the query compiler emits: `<property> eq|contains|has
//! <value>` clauses joined by `and`/`or` (with `and` binding tighter) and
//! parenthesized groups. `contains` is case-insensitive.

use serde_json::{Map, Value};

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// One comparison.
    Compare {
        /// Property name, unescaped.
        property: String,
        /// Operator keyword.
        op: CompareOp,
        /// Right-hand side.
        value: Value,
    },
    /// All must match.
    And(Vec<Filter>),
    /// Any must match.
    Or(Vec<Filter>),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `eq`
    Eq,
    /// `contains`
    Contains,
    /// `has`
    Has,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Number(Value),
    Open,
    Close,
}

impl Filter {
    /// Parses a filter string.
    pub fn parse(input: &str) -> Result<Self, String> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let filter = parser.or_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(format!("unexpected token {:?}", parser.tokens[parser.pos]));
        }
        Ok(filter)
    }

    /// Returns true if the object matches.
    pub fn matches(&self, object: &Map<String, Value>) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(object)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(object)),
            Filter::Compare {
                property,
                op,
                value,
            } => {
                let actual = object.get(property).unwrap_or(&Value::Null);
                match op {
                    CompareOp::Eq => values_equal(actual, value),
                    CompareOp::Contains => match (actual, value) {
                        (Value::String(a), Value::String(b)) => {
                            a.to_lowercase().contains(&b.to_lowercase())
                        }
                        _ => false,
                    },
                    CompareOp::Has => relation_has(actual, value),
                }
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn relation_has(actual: &Value, id: &Value) -> bool {
    let Some(id) = id.as_str() else {
        return false;
    };
    let refers = |v: &Value| match v {
        Value::String(s) => s == id,
        Value::Object(o) => o.get("sysObjectId").and_then(Value::as_str) == Some(id),
        _ => false,
    };
    match actual {
        Value::Array(items) => items.iter().any(refers),
        Value::Object(o) if o.contains_key("sysObjects") => o
            .get("sysObjects")
            .and_then(Value::as_array)
            .map_or(false, |items| items.iter().any(refers)),
        other => refers(other),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => s.push(chars.next().ok_or("dangling escape")?),
                        Some('"') => break,
                        Some(other) => s.push(other),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || matches!(d, '.' | '-' | '+' | 'e' | 'E') {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number: Value =
                    serde_json::from_str(&s).map_err(|_| format!("bad number {}", s))?;
                tokens.push(Token::Number(number));
            }
            _ => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_whitespace() || d == '(' || d == ')' || d == '"' {
                        break;
                    }
                    chars.next();
                    if d == '\\' {
                        s.push(chars.next().ok_or("dangling escape")?);
                    } else {
                        s.push(d);
                    }
                }
                tokens.push(Token::Word(s));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_word(&self, word: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w == word)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn or_expr(&mut self) -> Result<Filter, String> {
        let mut parts = vec![self.and_expr()?];
        while self.peek_word("or") {
            self.pos += 1;
            parts.push(self.and_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::Or(parts)
        })
    }

    fn and_expr(&mut self) -> Result<Filter, String> {
        let mut parts = vec![self.primary()?];
        while self.peek_word("and") {
            self.pos += 1;
            parts.push(self.primary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::And(parts)
        })
    }

    fn primary(&mut self) -> Result<Filter, String> {
        match self.next() {
            Some(Token::Open) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    other => Err(format!("expected ')', got {:?}", other)),
                }
            }
            Some(Token::Word(property)) => {
                let op = match self.next() {
                    Some(Token::Word(w)) if w == "eq" => CompareOp::Eq,
                    Some(Token::Word(w)) if w == "contains" => CompareOp::Contains,
                    Some(Token::Word(w)) if w == "has" => CompareOp::Has,
                    other => return Err(format!("expected operator, got {:?}", other)),
                };
                let value = match self.next() {
                    Some(Token::Str(s)) => Value::String(s),
                    Some(Token::Number(n)) => n,
                    Some(Token::Word(w)) if w == "true" => Value::Bool(true),
                    Some(Token::Word(w)) if w == "false" => Value::Bool(false),
                    Some(Token::Word(w)) if w == "null" => Value::Null,
                    other => return Err(format!("expected value, got {:?}", other)),
                };
                Ok(Filter::Compare {
                    property,
                    op,
                    value,
                })
            }
            other => Err(format!("expected clause, got {:?}", other)),
        }
    }
}
