//! Restricted router-condition expression language.
//!
//! Conditions are boolean expressions built from `and` / `or` / `not`,
//! chained comparisons, arithmetic, literals, and `$input.*` / `$nodes.*.*`
//! / `$state.*` references, ported from `wf_runtime.engine.nodes.router`.
//! Unlike full Python `ast`, only [`ast.Not`] is an allowed unary operator:
//! there is no unary minus, so negative numeric literals are not supported.

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde_json::Value;

use nebula_error::{NebulaError, Result};

use crate::mapping::resolve_expr;

fn router_error(reason: impl Into<String>) -> NebulaError {
    NebulaError::RouterError {
        node_id: String::new(),
        reason: reason.into(),
    }
}

fn ref_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"\$(?:input(?:\.[A-Za-z0-9_]+)+|nodes\.[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)+|state\.[A-Za-z0-9_]+)",
        )
        .expect("static regex is valid")
    })
}

/// Replaces every `$input.*` / `$nodes.*.*` / `$state.*` reference in
/// `condition` with a `ref_N` placeholder, returning the rewritten
/// expression text and the ordered list of original reference strings.
fn extract_refs(condition: &str) -> (String, Vec<String>) {
    let mut refs = Vec::new();
    let rewritten = ref_pattern().replace_all(condition, |caps: &regex::Captures| {
        let idx = refs.len();
        refs.push(caps[0].to_string());
        format!("ref_{idx}")
    });
    (rewritten.into_owned(), refs)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => return Err(router_error("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text
                    .parse()
                    .map_err(|_| router_error(format!("invalid numeric literal: {text}")))?;
                tokens.push(Token::Number(n));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(router_error(format!("unexpected character: {other}"))),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Ref(String),
    Not(Box<Expr>),
    BoolOp { op: BoolOp, values: Vec<Expr> },
    BinOp { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    Compare { first: Box<Expr>, rest: Vec<(CmpOp, Expr)> },
}

#[derive(Debug, Clone, Copy)]
enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == tok => Ok(()),
            other => Err(router_error(format!("expected {tok:?}, found {other:?}"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut values = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            values.push(self.parse_and()?);
        }
        if values.len() == 1 {
            Ok(values.pop().expect("non-empty"))
        } else {
            Ok(Expr::BoolOp { op: BoolOp::Or, values })
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut values = vec![self.parse_not()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            values.push(self.parse_not()?);
        }
        if values.len() == 1 {
            Ok(values.pop().expect("non-empty"))
        } else {
            Ok(Expr::BoolOp { op: BoolOp::And, values })
        }
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let first = self.parse_add()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Ne) => CmpOp::Ne,
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_add()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare { first: Box::new(first), rest })
        }
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut left = self.parse_atom()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_atom()?;
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => Ok(Expr::Ref(name)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(router_error(format!("unexpected token: {other:?}"))),
        }
    }
}

fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(router_error("trailing input after expression"));
    }
    Ok(expr)
}

/// Python-like truthiness: `null`, `false`, `0`, `""`, and empty
/// arrays/objects are falsy; everything else is truthy.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_f64(v: &Value, context: &str) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| router_error(format!("expected a number in {context}, found {v}")))
}

fn eval(expr: &Expr, env: &IndexMap<String, Value>) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::from(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Ref(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| router_error(format!("unknown identifier: {name}"))),
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, env)?))),
        Expr::BoolOp { op, values } => {
            for (idx, v) in values.iter().enumerate() {
                let val = eval(v, env)?;
                let t = truthy(&val);
                match op {
                    BoolOp::Or if t => return Ok(val),
                    BoolOp::And if !t => return Ok(val),
                    _ if idx == values.len() - 1 => return Ok(val),
                    _ => continue,
                }
            }
            Ok(Value::Bool(matches!(op, BoolOp::And)))
        }
        Expr::BinOp { op, left, right } => {
            let l = as_f64(&eval(left, env)?, "arithmetic expression")?;
            let r = as_f64(&eval(right, env)?, "arithmetic expression")?;
            let result = match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r == 0.0 {
                        return Err(router_error("division by zero"));
                    }
                    l / r
                }
                BinOp::Mod => {
                    if r == 0.0 {
                        return Err(router_error("modulo by zero"));
                    }
                    l % r
                }
            };
            Ok(Value::from(result))
        }
        Expr::Compare { first, rest } => {
            let mut left = eval(first, env)?;
            for (op, next_expr) in rest {
                let right = eval(next_expr, env)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
    let ordering = match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            let l = left.as_f64().expect("checked number");
            let r = right.as_f64().expect("checked number");
            l.partial_cmp(&r)
        }
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            return Ok(match op {
                CmpOp::Eq => left == right,
                CmpOp::Ne => left != right,
                _ => unreachable!(),
            });
        }
        _ => {
            return Err(router_error(format!(
                "cannot compare {left} and {right}"
            )))
        }
    };
    let Some(ordering) = ordering else {
        return Err(router_error(format!("cannot compare {left} and {right}")));
    };
    Ok(match op {
        CmpOp::Eq => ordering == std::cmp::Ordering::Equal,
        CmpOp::Ne => ordering != std::cmp::Ordering::Equal,
        CmpOp::Lt => ordering == std::cmp::Ordering::Less,
        CmpOp::Le => ordering != std::cmp::Ordering::Greater,
        CmpOp::Gt => ordering == std::cmp::Ordering::Greater,
        CmpOp::Ge => ordering != std::cmp::Ordering::Less,
    })
}

/// Evaluates a router condition against `state`, returning its truthiness.
///
/// The literal condition `"else"` always matches, letting a case double as
/// the router's fallback.
pub fn eval_condition(condition: &str, state: &Value) -> Result<bool> {
    if condition.trim() == "else" {
        return Ok(true);
    }

    let (rewritten, refs) = extract_refs(condition);
    let expr = parse(&rewritten)?;

    let mut env = IndexMap::with_capacity(refs.len());
    for (idx, original) in refs.iter().enumerate() {
        let value = resolve_expr(state, &Value::String(original.clone()), false)?;
        env.insert(format!("ref_{idx}"), value);
    }

    let result = eval(&expr, &env)?;
    Ok(truthy(&result))
}

/// Picks the label of the first case whose condition is true, in declared
/// insertion order, falling back to `default_label` if none match.
pub fn pick_route(
    cases: &IndexMap<String, String>,
    default_label: Option<&str>,
    state: &Value,
) -> Result<Option<String>> {
    for (label, condition) in cases {
        if eval_condition(condition, state)? {
            return Ok(Some(label.clone()));
        }
    }
    Ok(default_label.map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with_input(input: Value) -> Value {
        json!({ "input": input, "data": {}, "last_node": Value::Null })
    }

    #[test]
    fn simple_comparison() {
        let state = state_with_input(json!({"amount": 10}));
        assert!(eval_condition("$input.amount > 5", &state).unwrap());
        assert!(!eval_condition("$input.amount > 50", &state).unwrap());
    }

    #[test]
    fn boolean_combinators() {
        let state = state_with_input(json!({"a": 1, "b": 2}));
        assert!(eval_condition("$input.a == 1 and $input.b == 2", &state).unwrap());
        assert!(eval_condition("$input.a == 9 or $input.b == 2", &state).unwrap());
        assert!(eval_condition("not $input.a == 9", &state).unwrap());
    }

    #[test]
    fn chained_comparison() {
        let state = state_with_input(json!({"x": 5}));
        assert!(eval_condition("1 < $input.x < 10", &state).unwrap());
        assert!(!eval_condition("1 < $input.x < 4", &state).unwrap());
    }

    #[test]
    fn arithmetic() {
        let state = state_with_input(json!({"x": 4}));
        assert!(eval_condition("$input.x * 2 == 8", &state).unwrap());
        assert!(eval_condition("$input.x % 2 == 0", &state).unwrap());
    }

    #[test]
    fn unary_minus_is_unsupported() {
        let state = state_with_input(json!({}));
        assert!(eval_condition("-1 == -1", &state).is_err());
    }

    #[test]
    fn string_equality() {
        let state = state_with_input(json!({"op": "add"}));
        assert!(eval_condition("$input.op == 'add'", &state).unwrap());
    }

    #[test]
    fn pick_route_returns_first_matching_case_in_order() {
        let state = state_with_input(json!({"op": "sub"}));
        let mut cases = IndexMap::new();
        cases.insert("add".to_string(), "$input.op == 'add'".to_string());
        cases.insert("sub".to_string(), "$input.op == 'sub'".to_string());
        let picked = pick_route(&cases, Some("else"), &state).unwrap();
        assert_eq!(picked, Some("sub".to_string()));
    }

    #[test]
    fn else_keyword_always_matches() {
        let state = state_with_input(json!({}));
        assert!(eval_condition("else", &state).unwrap());
        assert!(eval_condition("  else  ", &state).unwrap());
    }

    #[test]
    fn pick_route_falls_back_to_default() {
        let state = state_with_input(json!({"op": "mul"}));
        let mut cases = IndexMap::new();
        cases.insert("add".to_string(), "$input.op == 'add'".to_string());
        let picked = pick_route(&cases, Some("else"), &state).unwrap();
        assert_eq!(picked, Some("else".to_string()));
    }
}
