//! Label-selector expressions
//!
//! Parses Kubernetes label-selector syntax into a reusable [`Selector`]. The
//! same selector type filters objects by annotations (the annotation filter)
//! and by labels (the coarse cache listing filter).
//!
//! Supported requirements, comma-separated and AND-ed:
//!
//! ```text
//! key=value   key==value   key!=value
//! key in (v1,v2)   key notin (v1,v2)
//! key   !key
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SourceError};

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// One `key <op> values` clause of a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn matches(&self, set: &BTreeMap<String, String>) -> bool {
        let value = set.get(&self.key);
        match self.operator {
            Operator::Equals | Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = || self.values.iter().cloned().collect::<Vec<_>>().join(",");
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, joined()),
            Operator::NotEquals => write!(f, "{}!={}", self.key, joined()),
            Operator::In => write!(f, "{} in ({})", self.key, joined()),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, joined()),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// Compiled selector; an empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector that matches every set
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parse a selector expression
    pub fn parse(expression: &str) -> Result<Self> {
        if expression.trim().is_empty() {
            return Ok(Self::everything());
        }

        let tokens = Lexer::new(expression).tokenize();
        Parser {
            expression,
            tokens,
            pos: 0,
        }
        .parse()
    }

    /// True when the selector has no requirements
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn matches(&self, set: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(set))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl std::str::FromStr for Selector {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Identifier(String),
    Not,
    Equals,
    DoubleEquals,
    NotEquals,
    In,
    NotIn,
    OpenParen,
    CloseParen,
    Comma,
    Invalid(char),
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "{:?}", s),
            Token::Not => write!(f, "'!'"),
            Token::Equals => write!(f, "'='"),
            Token::DoubleEquals => write!(f, "'=='"),
            Token::NotEquals => write!(f, "'!='"),
            Token::In => write!(f, "'in'"),
            Token::NotIn => write!(f, "'notin'"),
            Token::OpenParen => write!(f, "'('"),
            Token::CloseParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Invalid(c) => write!(f, "{:?}", c),
            Token::End => write!(f, "end of input"),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::End;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }

        let Some(c) = self.chars.next() else {
            return Token::End;
        };

        match c {
            ',' => Token::Comma,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '=' => {
                if self.chars.next_if_eq(&'=').is_some() {
                    Token::DoubleEquals
                } else {
                    Token::Equals
                }
            }
            '!' => {
                if self.chars.next_if_eq(&'=').is_some() {
                    Token::NotEquals
                } else {
                    Token::Not
                }
            }
            '<' | '>' => Token::Invalid(c),
            _ => {
                let mut ident = String::from(c);
                while let Some(&next) = self.chars.peek() {
                    if next.is_whitespace() || is_special(next) {
                        break;
                    }
                    ident.push(next);
                    self.chars.next();
                }
                match ident.as_str() {
                    "in" => Token::In,
                    "notin" => Token::NotIn,
                    _ => Token::Identifier(ident),
                }
            }
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, ',' | '(' | ')' | '=' | '!' | '<' | '>')
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Selector> {
        let mut requirements = Vec::new();
        loop {
            requirements.push(self.requirement()?);
            match self.next() {
                Token::Comma => continue,
                Token::End => break,
                other => return Err(self.error(format!("found {}, expected ','", other))),
            }
        }
        Ok(Selector { requirements })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::End)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::End {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> SourceError {
        SourceError::filter_syntax(self.expression, reason)
    }

    fn requirement(&mut self) -> Result<Requirement> {
        let (key, negated) = match self.next() {
            Token::Not => match self.next() {
                Token::Identifier(key) => (key, true),
                other => return Err(self.error(format!("found {}, expected key after '!'", other))),
            },
            Token::Identifier(key) => (key, false),
            other => return Err(self.error(format!("found {}, expected key", other))),
        };
        validate_key(&key).map_err(|reason| self.error(reason))?;

        if negated {
            return Ok(Requirement {
                key,
                operator: Operator::DoesNotExist,
                values: BTreeSet::new(),
            });
        }

        let operator = match self.peek().clone() {
            Token::Comma | Token::End => {
                return Ok(Requirement {
                    key,
                    operator: Operator::Exists,
                    values: BTreeSet::new(),
                })
            }
            Token::Equals | Token::DoubleEquals => Operator::Equals,
            Token::NotEquals => Operator::NotEquals,
            Token::In => Operator::In,
            Token::NotIn => Operator::NotIn,
            other => return Err(self.error(format!("found {}, expected operator", other))),
        };
        self.next();

        let values = match operator {
            Operator::In | Operator::NotIn => self.value_set()?,
            _ => self.single_value()?,
        };

        Ok(Requirement {
            key,
            operator,
            values,
        })
    }

    fn single_value(&mut self) -> Result<BTreeSet<String>> {
        let value = match self.peek().clone() {
            Token::Identifier(value) => {
                self.next();
                value
            }
            Token::Comma | Token::End => String::new(),
            other => return Err(self.error(format!("found {}, expected value", other))),
        };
        validate_value(&value).map_err(|reason| self.error(reason))?;
        Ok(BTreeSet::from([value]))
    }

    fn value_set(&mut self) -> Result<BTreeSet<String>> {
        match self.next() {
            Token::OpenParen => {}
            other => return Err(self.error(format!("found {}, expected '('", other))),
        }

        let mut values = BTreeSet::new();
        loop {
            match self.next() {
                Token::Identifier(value) => {
                    validate_value(&value).map_err(|reason| self.error(reason))?;
                    values.insert(value);
                }
                other => return Err(self.error(format!("found {}, expected value", other))),
            }
            match self.next() {
                Token::Comma => continue,
                Token::CloseParen => break,
                other => return Err(self.error(format!("found {}, expected ',' or ')'", other))),
            }
        }
        Ok(values)
    }
}

fn validate_key(key: &str) -> std::result::Result<(), String> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN || !is_dns_subdomain(prefix) {
                return Err(format!("invalid key prefix {:?}", prefix));
            }
            name
        }
        None => key,
    };

    if name.is_empty() || name.len() > MAX_NAME_LEN || !is_qualified_name_part(name) {
        return Err(format!("invalid key {:?}", key));
    }
    Ok(())
}

fn validate_value(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_NAME_LEN || !is_qualified_name_part(value) {
        return Err(format!("invalid value {:?}", value));
    }
    Ok(())
}

/// `[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?`
fn is_qualified_name_part(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_alphanumeric();
    bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn is_dns_subdomain(s: &str) -> bool {
    s.split('.').all(|label| {
        let bytes = label.as_bytes();
        let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
        bytes.first().is_some_and(edge_ok)
            && bytes.last().is_some_and(edge_ok)
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
    })
}
