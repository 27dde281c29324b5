//! Prolog-style rules: parsing, arithmetic evaluation and validation
//!
//! Only a small fragment is executable: `name(X, Y) :- Y is Expr.` where
//! `Expr` is integer arithmetic over `X`. Every other clause can still be
//! syntax-checked and searched for contradictory goals.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static RE_IS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Z_][A-Za-z0-9_]*)\s+is\s+(.+?)\s*$").expect("valid `is` pattern")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule is empty")]
    Empty,

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("reasoning trace has no inferred_logic")]
    MissingInferredLogic,

    #[error("rule cannot be evaluated: {0}")]
    Unsupported(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),
}

type Result<T> = std::result::Result<T, RuleError>;

/// `name(arg, ...)` or a bare atom
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
    pub name: String,
    pub args: Vec<String>,
}

/// One body literal, possibly negated with `\+` or `not(..)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub negated: bool,
    pub text: String,
}

impl Literal {
    /// Whitespace-insensitive form used to compare goals
    fn key(&self) -> String {
        self.text.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub head: Goal,
    pub body: Vec<Literal>,
}

fn is_variable(arg: &str) -> bool {
    arg.chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
        && arg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_atom_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split on `sep` outside parentheses and brackets
fn split_top_level(text: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(RuleError::Syntax(format!("unbalanced ')' in {:?}", text)));
                }
            }
            _ if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RuleError::Syntax(format!("unbalanced '(' in {:?}", text)));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

/// Strip one pair of parentheses that wraps the whole text
fn strip_outer_parens(text: &str) -> &str {
    let t = text.trim();
    if t.starts_with('(') && t.ends_with(')') {
        let inner = &t[1..t.len() - 1];
        if split_top_level(inner, ',').is_ok() {
            return inner.trim();
        }
    }
    t
}

impl Goal {
    fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, args) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| RuleError::Syntax(format!("goal {:?} is not closed", text)))?;
                let args: Vec<String> = split_top_level(inner, ',')?
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .collect();
                if args.iter().any(String::is_empty) {
                    return Err(RuleError::Syntax(format!("empty argument in {:?}", text)));
                }
                (text[..open].trim(), args)
            }
            None => (text, Vec::new()),
        };
        if !is_atom_name(name) {
            return Err(RuleError::Syntax(format!("invalid predicate name {:?}", name)));
        }
        Ok(Goal {
            name: name.to_string(),
            args,
        })
    }
}

impl Literal {
    fn parse(text: &str) -> Result<Self> {
        let t = text.trim();
        if t.is_empty() {
            return Err(RuleError::Syntax("empty goal in body".into()));
        }
        if let Some(rest) = t.strip_prefix("\\+") {
            return Ok(Literal {
                negated: true,
                text: strip_outer_parens(rest).to_string(),
            });
        }
        if let Some(rest) = t.strip_prefix("not") {
            let rest = rest.trim_start();
            if rest.starts_with('(') && rest.ends_with(')') {
                return Ok(Literal {
                    negated: true,
                    text: strip_outer_parens(rest).to_string(),
                });
            }
        }
        Ok(Literal {
            negated: false,
            text: t.to_string(),
        })
    }
}

impl Clause {
    /// Parse `head.` or `head :- goal, goal.`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RuleError::Empty);
        }
        let text = text
            .strip_suffix('.')
            .ok_or_else(|| RuleError::Syntax("clause must end with '.'".into()))?;

        let (head, body) = match text.find(":-") {
            Some(neck) => (&text[..neck], Some(&text[neck + 2..])),
            None => (text, None),
        };

        let head = Goal::parse(head)?;
        let body = match body {
            Some(body) if body.trim().is_empty() => {
                return Err(RuleError::Syntax("rule body is empty".into()))
            }
            Some(body) => split_top_level(body, ',')?
                .into_iter()
                .map(Literal::parse)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Clause { head, body })
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Goals asserted both positively and negated in the body
    pub fn contradictions(&self) -> Vec<String> {
        let positive: BTreeSet<String> = self
            .body
            .iter()
            .filter(|l| !l.negated)
            .map(Literal::key)
            .collect();
        self.body
            .iter()
            .filter(|l| l.negated && positive.contains(&l.key()))
            .map(|l| l.text.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Num(i64),
    Var(String),
    Op(&'static str),
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let n = digits
                    .parse()
                    .map_err(|_| RuleError::Evaluation(format!("number too large: {}", digits)))?;
                tokens.push(Token::Num(n));
            }
            'A'..='Z' | '_' | 'a'..='z' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "mod" {
                    tokens.push(Token::Op("mod"));
                } else if is_variable(&word) {
                    tokens.push(Token::Var(word));
                } else {
                    return Err(RuleError::Unsupported(format!("unknown function {:?}", word)));
                }
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::Op("//"));
                i += 2;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(match c {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    _ => "/",
                }));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            other => {
                return Err(RuleError::Syntax(format!("unexpected {:?} in expression", other)))
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Num(i64),
    Var(String),
    Neg(Box<Expr>),
    Bin(&'static str, Box<Expr>, Box<Expr>),
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn parse(text: &str) -> Result<Expr> {
        let mut parser = ExprParser {
            tokens: tokenize(text)?,
            pos: 0,
        };
        let expr = parser.sum()?;
        if parser.pos != parser.tokens.len() {
            return Err(RuleError::Syntax(format!("trailing input in {:?}", text)));
        }
        Ok(expr)
    }

    fn peek_op(&self, ops: &[&str]) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn sum(&mut self) -> Result<Expr> {
        let mut lhs = self.product()?;
        while let Some(op) = self.peek_op(&["+", "-"]) {
            self.pos += 1;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(self.product()?));
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_op(&["*", "/", "//", "mod"]) {
            self.pos += 1;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.peek_op(&["-"]).is_some() {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Var(v)) => Ok(Expr::Var(v)),
            Some(Token::Open) => {
                let inner = self.sum()?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(RuleError::Syntax("missing ')' in expression".into())),
                }
            }
            _ => Err(RuleError::Syntax("expected a number, variable or '('".into())),
        }
    }
}

impl Expr {
    fn variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(v) => {
                out.insert(v.clone());
            }
            Expr::Neg(e) => e.variables(out),
            Expr::Bin(_, a, b) => {
                a.variables(out);
                b.variables(out);
            }
        }
    }

    fn eval(&self, var: &str, x: i64) -> Result<i64> {
        let overflow = || RuleError::Evaluation("integer overflow".into());
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var(v) if v == var => Ok(x),
            Expr::Var(v) => Err(RuleError::Evaluation(format!("unbound variable {}", v))),
            Expr::Neg(e) => e.eval(var, x)?.checked_neg().ok_or_else(overflow),
            Expr::Bin(op, a, b) => {
                let (a, b) = (a.eval(var, x)?, b.eval(var, x)?);
                if matches!(*op, "/" | "//" | "mod") && b == 0 {
                    return Err(RuleError::Evaluation("division by zero".into()));
                }
                match *op {
                    "+" => a.checked_add(b).ok_or_else(overflow),
                    "-" => a.checked_sub(b).ok_or_else(overflow),
                    "*" => a.checked_mul(b).ok_or_else(overflow),
                    "/" => match a.checked_rem(b) {
                        None => Err(overflow()),
                        Some(0) => a.checked_div(b).ok_or_else(overflow),
                        Some(_) => Err(RuleError::Evaluation(format!(
                            "{} / {} is not an integer",
                            a, b
                        ))),
                    },
                    "//" => a.checked_div(b).ok_or_else(overflow),
                    _ => a.checked_rem_euclid(b).ok_or_else(overflow),
                }
            }
        }
    }
}

/// A rule of the form `name(X, Y) :- Y is Expr.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithmeticRule {
    pub name: String,
    input: String,
    expr: Expr,
}

impl ArithmeticRule {
    pub fn from_clause(clause: &Clause) -> Result<Self> {
        let unsupported = || {
            RuleError::Unsupported("only `name(X, Y) :- Y is Expr.` rules can be evaluated".into())
        };
        let [input, output] = clause.head.args.as_slice() else {
            return Err(unsupported());
        };
        let [literal] = clause.body.as_slice() else {
            return Err(unsupported());
        };
        if literal.negated || !is_variable(input) || !is_variable(output) || input == output {
            return Err(unsupported());
        }

        let caps = RE_IS.captures(&literal.text).ok_or_else(unsupported)?;
        if &caps[1] != output.as_str() {
            return Err(unsupported());
        }
        let expr = ExprParser::parse(&caps[2])?;

        let mut vars = BTreeSet::new();
        expr.variables(&mut vars);
        if let Some(other) = vars.iter().find(|v| *v != input) {
            return Err(RuleError::Unsupported(format!("unbound variable {}", other)));
        }

        Ok(Self {
            name: clause.head.name.clone(),
            input: input.clone(),
            expr,
        })
    }

    pub fn apply(&self, x: i64) -> Result<i64> {
        self.expr.eval(&self.input, x)
    }
}

/// An input/output pair written `in=out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl FromStr for TestCase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (input, output) = s
            .split_once('=')
            .ok_or_else(|| format!("expected in=out, got {:?}", s))?;
        Ok(TestCase::new(input.trim(), output.trim()))
    }
}

fn parse_int(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| RuleError::Evaluation(format!("{:?} is not an integer", value)))
}

/// Result of validating one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleVerdict {
    pub rule: String,
    pub valid: bool,
    pub failed_cases: Vec<String>,
    pub contradictions: Vec<String>,
    /// Inputs where changing the input left the output unchanged, counted
    /// only when that holds for every distinct input
    pub counterfactual_failures: u32,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_syntax(&self, rule: &str) -> Result<Clause> {
        Clause::parse(rule)
    }

    /// Syntax, test cases, contradictions and input dependence
    pub fn validate(&self, rule: &str, cases: &[TestCase]) -> Result<RuleVerdict> {
        let clause = self.validate_syntax(rule)?;
        let contradictions = clause.contradictions();
        if !contradictions.is_empty() {
            tracing::warn!("Rule {} contradicts itself on {:?}", rule, contradictions);
        }

        let mut failed_cases = Vec::new();
        let mut counterfactual_failures = 0;

        if !cases.is_empty() {
            let arithmetic = ArithmeticRule::from_clause(&clause)?;
            let mut inputs = BTreeSet::new();

            for case in cases {
                let x = parse_int(&case.input)?;
                let expected = parse_int(&case.output)?;
                inputs.insert(x);
                match arithmetic.apply(x) {
                    Ok(actual) if actual == expected => {}
                    Ok(actual) => failed_cases.push(format!(
                        "{} -> expected {}, got {}",
                        case.input, case.output, actual
                    )),
                    Err(e) => failed_cases.push(format!("{} -> {}", case.input, e)),
                }
            }
            if !failed_cases.is_empty() {
                tracing::warn!("Rule validation failed for {:?}", failed_cases);
            }

            if inputs.len() > 1 {
                let outputs = inputs
                    .iter()
                    .map(|&x| arithmetic.apply(x))
                    .collect::<Result<BTreeSet<_>>>();
                if matches!(outputs, Ok(ref o) if o.len() == 1) {
                    counterfactual_failures = u32::try_from(inputs.len()).unwrap_or(u32::MAX);
                    tracing::warn!("Rule {} ignores its input", rule);
                }
            }
        }

        let valid = contradictions.is_empty() && failed_cases.is_empty() && counterfactual_failures == 0;
        if valid {
            tracing::info!("Rule validated successfully: {}", rule);
        }
        Ok(RuleVerdict {
            rule: rule.trim().to_string(),
            valid,
            failed_cases,
            contradictions,
            counterfactual_failures,
        })
    }
}

/// Take the rule a reasoning trace inferred
pub fn propose_rule(trace: &serde_json::Value) -> Result<String> {
    let logic = trace
        .get("inferred_logic")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RuleError::MissingInferredLogic)?;
    let task = trace.get("task_id").and_then(|v| v.as_str()).unwrap_or("unknown");
    tracing::info!("Proposed causal rule for task {}: {}", task, logic);
    Ok(logic.to_string())
}
