//! `enable-if` environment predicates.
//!
//! A provider may declare a marker such as `python_version >= '3.12'`. The
//! marker is evaluated once per session against an [`Environment`]; a
//! provider whose marker is false is left out of the active set.
//!
//! Grammar:
//!
//! ```text
//! expr    := and ('or' and)*
//! and     := atom ('and' atom)*
//! atom    := '(' expr ')' | operand op operand
//! operand := IDENT | 'literal' | "literal"
//! op      := == | != | < | <= | > | >= | in | not in
//! ```
//!
//! Ordered comparisons need both operands to be versions: dotted release
//! numbers of any length (`3`, `3.12`, `3.12.0.1`) with an optional
//! pre-release tag (`3.13.0a2`, `3.13.0b1`, `3.13.0rc1`). Equality falls back
//! to plain string comparison when either side is not a version.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use semver::Prerelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Result, VariantError};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(\(|\)|==|!=|<=|>=|<|>|'[^']*'|"[^"]*"|[A-Za-z_][A-Za-z0-9_.]*)"#)
        .expect("token pattern is valid")
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?([0-9]+(?:\.[0-9]+)*)(?:[-_.]?(a|alpha|b|beta|c|rc|pre|preview)[-_.]?([0-9]*))?$")
        .expect("version pattern is valid")
});

/// Marker variables and their values for the current environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An environment with no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment pre-populated with the host operating system and
    /// architecture (`os_name`, `sys_platform`, `platform_system`,
    /// `platform_machine`).
    pub fn host() -> Self {
        let os = std::env::consts::OS;
        let (os_name, sys_platform, platform_system) = match os {
            "windows" => ("nt", "win32", "Windows"),
            "macos" => ("posix", "darwin", "Darwin"),
            "linux" => ("posix", "linux", "Linux"),
            other => ("posix", other, other),
        };

        Environment::new()
            .with("os_name", os_name)
            .with("sys_platform", sys_platform)
            .with("platform_system", platform_system)
            .with("platform_machine", std::env::consts::ARCH)
    }

    /// Set a variable, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Variable(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Compare { left: Operand, op: Op, right: Operand },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A parsed `enable-if` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    source: String,
    expr: Expr,
}

impl Marker {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(invalid(source, format!("unexpected `{}`", tokens[parser.pos])));
        }
        Ok(Marker {
            source: source.to_string(),
            expr,
        })
    }

    /// The marker as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against an environment. Unknown variables are an error.
    pub fn evaluate(&self, env: &Environment) -> Result<bool> {
        self.eval_expr(&self.expr, env)
    }

    fn eval_expr(&self, expr: &Expr, env: &Environment) -> Result<bool> {
        match expr {
            Expr::And(a, b) => Ok(self.eval_expr(a, env)? && self.eval_expr(b, env)?),
            Expr::Or(a, b) => Ok(self.eval_expr(a, env)? || self.eval_expr(b, env)?),
            Expr::Compare { left, op, right } => {
                let left = self.resolve(left, env)?;
                let right = self.resolve(right, env)?;
                self.compare(left, *op, right)
            }
        }
    }

    fn resolve<'a>(&self, operand: &'a Operand, env: &'a Environment) -> Result<&'a str> {
        match operand {
            Operand::Literal(s) => Ok(s),
            Operand::Variable(name) => env
                .get(name)
                .ok_or_else(|| invalid(&self.source, format!("unknown variable `{}`", name))),
        }
    }

    fn compare(&self, left: &str, op: Op, right: &str) -> Result<bool> {
        let accept: fn(Ordering) -> bool = match op {
            Op::In => return Ok(right.contains(left)),
            Op::NotIn => return Ok(!right.contains(left)),
            Op::Eq => Ordering::is_eq,
            Op::Ne => Ordering::is_ne,
            Op::Lt => Ordering::is_lt,
            Op::Le => Ordering::is_le,
            Op::Gt => Ordering::is_gt,
            Op::Ge => Ordering::is_ge,
        };

        match (MarkerVersion::parse(left), MarkerVersion::parse(right)) {
            (Some(l), Some(r)) => Ok(accept(l.cmp(&r))),
            _ => match op {
                Op::Eq => Ok(left == right),
                Op::Ne => Ok(left != right),
                _ => Err(invalid(
                    &self.source,
                    format!("cannot order `{}` and `{}`: not versions", left, right),
                )),
            },
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Marker {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self> {
        Marker::parse(s)
    }
}

impl Serialize for Marker {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Marker {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Marker::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A marker operand read as a version: dotted release numbers of any length
/// plus an optional `a`/`b`/`rc` pre-release tag.
///
/// Missing release components are zero (`3.12` == `3.12.0`) and a
/// pre-release sorts before its release (`3.13.0rc1` < `3.13`).
#[derive(Debug, Clone)]
struct MarkerVersion {
    release: Vec<u64>,
    pre: Prerelease,
}

impl MarkerVersion {
    fn parse(s: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(s.trim())?;
        let release = caps
            .get(1)?
            .as_str()
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        let pre = match caps.get(2) {
            None => Prerelease::EMPTY,
            Some(tag) => {
                let tag = match tag.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => "a",
                    "b" | "beta" => "b",
                    _ => "rc",
                };
                let number: u64 = match caps.get(3).map(|m| m.as_str()) {
                    None | Some("") => 0,
                    Some(n) => n.parse().ok()?,
                };
                Prerelease::new(&format!("{}.{}", tag, number)).ok()?
            }
        };

        Some(MarkerVersion { release, pre })
    }
}

impl Ord for MarkerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        let component = |v: &MarkerVersion, i: usize| v.release.get(i).copied().unwrap_or(0);
        (0..len)
            .map(|i| component(self, i).cmp(&component(other, i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialEq for MarkerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for MarkerVersion {}

impl PartialOrd for MarkerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn invalid(marker: &str, message: String) -> VariantError {
    VariantError::InvalidMarker {
        marker: marker.to_string(),
        message,
    }
}

fn tokenize(source: &str) -> Result<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    loop {
        if rest.trim().is_empty() {
            break;
        }
        let caps = TOKEN_RE
            .captures(rest)
            .ok_or_else(|| invalid(source, format!("unexpected input at `{}`", rest.trim())))?;
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            return Err(invalid(source, "tokenizer failure".to_string()));
        };
        tokens.push(token.as_str());
        rest = &rest[whole.end()..];
    }
    if tokens.is_empty() {
        return Err(invalid(source, "empty marker".to_string()));
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<&'a str> {
        let token = self
            .peek()
            .ok_or_else(|| invalid(self.source, "unexpected end of marker".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut left = self.and()?;
        while self.peek() == Some("or") {
            self.pos += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut left = self.atom()?;
        while self.peek() == Some("and") {
            self.pos += 1;
            let right = self.atom()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn atom(&mut self) -> Result<Expr> {
        if self.peek() == Some("(") {
            self.pos += 1;
            let inner = self.expr()?;
            if self.next()? != ")" {
                return Err(invalid(self.source, "expected `)`".to_string()));
            }
            return Ok(inner);
        }

        let left = self.operand()?;
        let op = self.op()?;
        let right = self.operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    fn operand(&mut self) -> Result<Operand> {
        let token = self.next()?;
        if let Some(lit) = strip_quotes(token) {
            return Ok(Operand::Literal(lit.to_string()));
        }
        match token {
            "(" | ")" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "and" | "or" | "in" | "not" => {
                Err(invalid(self.source, format!("expected a value, found `{}`", token)))
            }
            _ => Ok(Operand::Variable(token.to_string())),
        }
    }

    fn op(&mut self) -> Result<Op> {
        let token = self.next()?;
        Ok(match token {
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "in" => Op::In,
            "not" => {
                if self.next()? != "in" {
                    return Err(invalid(self.source, "expected `in` after `not`".to_string()));
                }
                Op::NotIn
            }
            other => {
                return Err(invalid(
                    self.source,
                    format!("expected an operator, found `{}`", other),
                ))
            }
        })
    }
}

fn strip_quotes(token: &str) -> Option<&str> {
    token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| token.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
}
