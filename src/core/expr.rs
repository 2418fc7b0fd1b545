//! Expression trees for model equations
//!
//! Right-hand sides are parsed once into an [`Expr`] and every later stage
//! (substitution, differentiation, evaluation, dimension checks) walks the
//! tree instead of the text.

use std::fmt;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, One, Zero};
use thiserror::Error;

use crate::core::normalize::{is_identifier_char, is_identifier_start};

/// Errors raised while parsing expression text
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expression is empty")]
    Empty,

    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unexpected '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Function {name}() takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Functions callable from an equation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    /// Natural logarithm (`ln` or `log`)
    Ln,
    Sqrt,
    Abs,
    /// A called name we do not know how to evaluate
    Other(String),
}

impl Function {
    /// Look up a function by the name used in equation text
    pub fn from_name(name: &str) -> Self {
        match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "exp" => Function::Exp,
            "ln" | "log" => Function::Ln,
            "sqrt" => Function::Sqrt,
            "abs" | "Abs" => Function::Abs,
            other => Function::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Exp => "exp",
            Function::Ln => "log",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Other(name) => name,
        }
    }

    /// Functions that only make sense on dimensionless arguments
    pub fn requires_dimensionless(&self) -> bool {
        !matches!(
            self,
            Function::Sqrt | Function::Abs | Function::Other(_)
        )
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed algebraic expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Parse expression text (already normalized)
    pub fn parse(text: &str) -> Result<Expr, ParseError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        match parser.peek() {
            None => Ok(expr),
            Some((tok, pos)) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                pos,
            }),
        }
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Variable(name.into())
    }

    pub fn lit(value: f64) -> Expr {
        Expr::Literal(value)
    }

    /// The literal value, if this node is a literal
    pub fn as_literal(&self) -> Option<f64> {
        match self {
            Expr::Literal(v) => Some(*v),
            _ => None,
        }
    }

    fn is_literal(&self, value: f64) -> bool {
        self.as_literal() == Some(value)
    }

    // ------------------------------------------------------------------
    // Simplifying constructors
    // ------------------------------------------------------------------

    pub fn neg(operand: Expr) -> Expr {
        match operand {
            Expr::Literal(v) => Expr::Literal(-v),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => *operand,
            other => Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(other),
            },
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs.as_literal(), rhs.as_literal()) {
            (Some(a), Some(b)) => Expr::Literal(a + b),
            (Some(a), _) if a == 0.0 => rhs,
            (_, Some(b)) if b == 0.0 => lhs,
            _ => Expr::binary(BinaryOp::Add, lhs, rhs),
        }
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs.as_literal(), rhs.as_literal()) {
            (Some(a), Some(b)) => Expr::Literal(a - b),
            (Some(a), _) if a == 0.0 => Expr::neg(rhs),
            (_, Some(b)) if b == 0.0 => lhs,
            _ => Expr::binary(BinaryOp::Sub, lhs, rhs),
        }
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs.as_literal(), rhs.as_literal()) {
            (Some(a), Some(b)) => Expr::Literal(a * b),
            (Some(a), _) | (_, Some(a)) if a == 0.0 => Expr::Literal(0.0),
            (Some(a), _) if a == 1.0 => rhs,
            (_, Some(b)) if b == 1.0 => lhs,
            (Some(a), _) if a == -1.0 => Expr::neg(rhs),
            (_, Some(b)) if b == -1.0 => Expr::neg(lhs),
            _ => Expr::binary(BinaryOp::Mul, lhs, rhs),
        }
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs.as_literal(), rhs.as_literal()) {
            (Some(a), Some(b)) if b != 0.0 => Expr::Literal(a / b),
            (Some(a), _) if a == 0.0 && !rhs.is_literal(0.0) => Expr::Literal(0.0),
            (_, Some(b)) if b == 1.0 => lhs,
            _ => Expr::binary(BinaryOp::Div, lhs, rhs),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base.as_literal(), exponent.as_literal()) {
            (_, Some(e)) if e == 0.0 => Expr::Literal(1.0),
            (_, Some(e)) if e == 1.0 => base,
            (Some(b), Some(e)) if b.powf(e).is_finite() => Expr::Literal(b.powf(e)),
            _ => Expr::binary(BinaryOp::Pow, base, exponent),
        }
    }

    pub fn call(func: Function, arg: Expr) -> Expr {
        Expr::Call {
            func,
            args: vec![arg],
        }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Variable names in first-seen order, without duplicates
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Expr::Unary { operand, .. } => operand.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// True when the expression mentions `name`
    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Variable(v) => v == name,
            Expr::Unary { operand, .. } => operand.contains_variable(name),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.contains_variable(name) || rhs.contains_variable(name)
            }
            Expr::Call { args, .. } => args.iter().any(|a| a.contains_variable(name)),
        }
    }

    /// Unsupported function names used anywhere in the tree
    pub fn unknown_functions(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Call {
                func: Function::Other(name),
                ..
            } = node
            {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    fn walk(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Variable(_) => {}
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
        }
    }

    /// Fold a variable-free subtree into an exact rational
    ///
    /// Returns `None` when the subtree mentions a variable, calls a function,
    /// has a non-integer power, or overflows `i64`.
    pub fn constant_rational(&self) -> Option<Rational64> {
        match self {
            Expr::Literal(v) => rational_from_f64(*v),
            Expr::Variable(_) | Expr::Call { .. } => None,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Rational64::zero().checked_sub(&operand.constant_rational()?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.constant_rational()?;
                let b = rhs.constant_rational()?;
                match op {
                    BinaryOp::Add => a.checked_add(&b),
                    BinaryOp::Sub => a.checked_sub(&b),
                    BinaryOp::Mul => a.checked_mul(&b),
                    BinaryOp::Div => {
                        if b.is_zero() {
                            None
                        } else {
                            a.checked_div(&b)
                        }
                    }
                    BinaryOp::Pow => {
                        if !b.is_integer() {
                            return None;
                        }
                        rational_powi(a, *b.numer())
                    }
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Literal(v) if *v < 0.0 => 3,
            Expr::Literal(_) | Expr::Variable(_) | Expr::Call { .. } => 5,
            Expr::Unary { .. } => 3,
            Expr::Binary { op, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub => 1,
                BinaryOp::Mul | BinaryOp::Div => 2,
                BinaryOp::Pow => 4,
            },
        }
    }
}

/// Convert a literal to an exact fraction through its shortest decimal form
fn rational_from_f64(value: f64) -> Option<Rational64> {
    if !value.is_finite() {
        return None;
    }
    let text = format!("{}", value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text.as_str(), ""),
    };
    let digits = format!("{}{}", int_part, frac_part);
    let numer: i64 = digits.parse().ok()?;
    let mut denom: i64 = 1;
    for _ in 0..frac_part.len() {
        denom = denom.checked_mul(10)?;
    }
    let r = Rational64::new(numer, denom);
    Some(if value < 0.0 { -r } else { r })
}

fn rational_powi(base: Rational64, exponent: i64) -> Option<Rational64> {
    if exponent.unsigned_abs() > 64 {
        return None;
    }
    let mut acc = Rational64::one();
    for _ in 0..exponent.unsigned_abs() {
        acc = acc.checked_mul(&base)?;
    }
    if exponent < 0 {
        if acc.is_zero() {
            return None;
        }
        acc = acc.recip();
    }
    Some(acc)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Non-finite values use numerals that overflow back to ±inf when parsed
            Expr::Literal(v) if v.is_nan() => write!(f, "(1e999 - 1e999)"),
            Expr::Literal(v) if v.is_infinite() => {
                write!(f, "{}1e999", if *v < 0.0 { "-" } else { "" })
            }
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Unary { operand, .. } => {
                if operand.precedence() < 4 {
                    write!(f, "-({})", operand)
                } else {
                    write!(f, "-{}", operand)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = self.precedence();
                let (lhs_paren, rhs_paren) = match op {
                    BinaryOp::Add => (false, rhs.precedence() < prec),
                    BinaryOp::Mul => (lhs.precedence() < prec, rhs.precedence() < prec),
                    BinaryOp::Sub | BinaryOp::Div => {
                        (lhs.precedence() < prec, rhs.precedence() <= prec)
                    }
                    BinaryOp::Pow => (lhs.precedence() <= prec, rhs.precedence() < prec),
                };
                write_operand(f, lhs, lhs_paren)?;
                if *op == BinaryOp::Pow {
                    write!(f, "^")?;
                } else {
                    write!(f, " {} ", op.symbol())?;
                }
                write_operand(f, rhs, rhs_paren)
            }
            Expr::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, paren: bool) -> fmt::Result {
    if paren {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{}", v),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' | '·' | '⋅' | '×' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(&chars, i);
                let literal: String = chars[i..end].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(literal.clone()))?;
                i = end;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if is_identifier_start(c) => {
                let mut end = i + 1;
                while end < chars.len() && is_identifier_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[i..end].iter().collect();
                i = end;
                tokens.push((Token::Ident(name), start));
                continue;
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, pos: i }),
        };
        tokens.push((token, start));
        i += 1;
    }

    Ok(tokens)
}

/// Find the end of a numeric literal starting at `start`
fn scan_number(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    // Exponent only if followed by digits, so `2e` stays a number and a name
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

// ============================================================================
// Recursive-descent parser
// ============================================================================

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, p)| (t, *p))
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if matches!(self.peek(), Some((t, _)) if t == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.next() {
            Some((tok, _)) if tok == expected => Ok(()),
            Some((tok, pos)) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinaryOp::Add
            } else if self.eat(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinaryOp::Mul
            } else if self.eat(&Token::Slash) {
                BinaryOp::Div
            } else {
                break;
            };
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    // power := primary ('^' unary)?   (right associative through unary)
    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some((Token::Number(v), _)) => Ok(Expr::Literal(v)),
            Some((Token::Ident(name), _)) => {
                if self.eat(&Token::LParen) {
                    self.call(name)
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some((Token::LParen, _)) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some((tok, pos)) => Err(ParseError::UnexpectedToken {
                found: tok.to_string(),
                pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expression()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen)?;
                break;
            }
        }

        let func = Function::from_name(&name);
        if !matches!(func, Function::Other(_)) && args.len() != 1 {
            return Err(ParseError::Arity {
                name,
                expected: 1,
                found: args.len(),
            });
        }
        Ok(Expr::Call { func, args })
    }
}
