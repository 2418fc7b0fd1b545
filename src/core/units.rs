//! Unit algebra
//!
//! Unit strings such as `kg*m/s^2` or `V·A` are parsed into a [`Dimension`]:
//! a vector of rational exponents over the seven SI base dimensions.

use std::fmt;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub, One, Signed, Zero};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// SI base units, in the order dimensions are stored and rendered
pub const BASE_UNITS: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// Derived units, expanded by re-parsing their definition
const DERIVED_UNITS: &[(&str, &str)] = &[
    ("N", "kg*m/s^2"),
    ("Pa", "N/m^2"),
    ("J", "N*m"),
    ("W", "J/s"),
    ("Hz", "1/s"),
    ("C", "A*s"),
    ("V", "W/A"),
    ("ohm", "V/A"),
    ("Ω", "V/A"),
    ("S", "A/V"),
    ("F", "C/V"),
    ("H", "V*s/A"),
    ("T", "Wb/m^2"),
    ("Wb", "V*s"),
    ("lx", "lm/m^2"),
    ("lm", "cd"),
];

/// Celsius spellings; only the temperature dimension matters here
const CELSIUS_ALIASES: [&str; 4] = ["degC", "digC", "℃", "°C"];

/// Strings meaning "no unit"
const DIMENSIONLESS_SYMBOLS: [&str; 4] = ["", "1", "-", "—"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitParseError {
    #[error("Unknown unit '{token}' in unit expression '{text}'.")]
    UnknownUnit { token: String, text: String },

    #[error("Unsupported character '{ch}' in unit expression '{text}'.")]
    UnsupportedCharacter { ch: char, text: String },

    #[error("Unexpected token '{token}' in unit expression '{text}'.")]
    UnexpectedToken { token: String, text: String },

    #[error("Unexpected end of unit expression '{text}'.")]
    UnexpectedEnd { text: String },

    #[error("Missing ')' in unit expression '{text}'.")]
    MissingParen { text: String },

    #[error("Invalid exponent '{exponent}' in unit expression '{text}'.")]
    InvalidExponent { exponent: String, text: String },

    #[error("Exponent out of range in unit expression '{text}'.")]
    ExponentOverflow { text: String },
}

/// Rational exponents over the seven base dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension([Rational64; 7]);

impl Default for Dimension {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl Dimension {
    pub fn dimensionless() -> Self {
        Dimension([Rational64::zero(); 7])
    }

    /// Dimension of a single base unit (`m`, `kg`, ...)
    pub fn base(symbol: &str) -> Option<Self> {
        let index = BASE_UNITS.iter().position(|b| *b == symbol)?;
        let mut exps = [Rational64::zero(); 7];
        exps[index] = Rational64::one();
        Some(Dimension(exps))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|e| e.is_zero())
    }

    /// Exponent of a base unit
    pub fn exponent(&self, symbol: &str) -> Rational64 {
        BASE_UNITS
            .iter()
            .position(|b| *b == symbol)
            .map(|i| self.0[i])
            .unwrap_or_else(Rational64::zero)
    }

    /// Raise to a rational power; `None` when an exponent overflows
    pub fn checked_powr(&self, power: Rational64) -> Option<Self> {
        let mut exps = self.0;
        for e in exps.iter_mut() {
            *e = e.checked_mul(&power)?;
        }
        Some(Dimension(exps))
    }

    /// Product of two dimensions; `None` when an exponent overflows
    pub fn checked_mul(&self, rhs: &Dimension) -> Option<Self> {
        self.combine(rhs, <Rational64 as CheckedAdd>::checked_add)
    }

    /// Quotient of two dimensions; `None` when an exponent overflows
    pub fn checked_div(&self, rhs: &Dimension) -> Option<Self> {
        self.combine(rhs, <Rational64 as CheckedSub>::checked_sub)
    }

    fn combine(
        &self,
        rhs: &Dimension,
        op: fn(&Rational64, &Rational64) -> Option<Rational64>,
    ) -> Option<Self> {
        let mut exps = self.0;
        for (e, r) in exps.iter_mut().zip(rhs.0.iter()) {
            *e = op(e, r)?;
        }
        Some(Dimension(exps))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for (base, exp) in BASE_UNITS.iter().zip(self.0.iter()) {
            if exp.is_zero() {
                continue;
            }
            let term = format_term(base, exp.abs());
            if exp.is_positive() {
                positive.push(term);
            } else {
                negative.push(term);
            }
        }

        let numerator = if positive.is_empty() {
            "1".to_string()
        } else {
            positive.join("*")
        };
        if negative.is_empty() {
            write!(f, "{}", numerator)
        } else {
            write!(f, "{}/{}", numerator, negative.join("*"))
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn format_term(base: &str, exponent: Rational64) -> String {
    if exponent.is_one() {
        base.to_string()
    } else if exponent.is_integer() {
        format!("{}^{}", base, exponent.numer())
    } else {
        format!("{}^{}/{}", base, exponent.numer(), exponent.denom())
    }
}

/// Render an optional dimension, `--` when unresolved
pub fn format_dimension(dimension: Option<&Dimension>) -> String {
    match dimension {
        Some(d) => d.to_string(),
        None => "--".to_string(),
    }
}

/// Parse a unit expression into its dimension
pub fn parse_unit_expression(unit_text: &str) -> Result<Dimension, UnitParseError> {
    let text = unit_text.trim();
    if DIMENSIONLESS_SYMBOLS.contains(&text) {
        return Ok(Dimension::dimensionless());
    }
    let tokens = tokenize(text)?;
    let mut parser = UnitParser {
        tokens,
        index: 0,
        text,
    };
    let dimension = parser.expression()?;
    match parser.peek() {
        None => Ok(dimension),
        Some(token) => Err(UnitParseError::UnexpectedToken {
            token: token.to_string(),
            text: text.to_string(),
        }),
    }
}

fn is_unit_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | 'μ' | 'µ' | 'Ω' | '°' | '℃')
}

fn tokenize(text: &str) -> Result<Vec<String>, UnitParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let c = match c {
            '·' | '⋅' => '*',
            other => other,
        };
        if c.is_whitespace() {
            continue;
        }
        if is_unit_char(c) {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if matches!(c, '*' | '/' | '^' | '(' | ')' | '-') {
            tokens.push(c.to_string());
            continue;
        }
        return Err(UnitParseError::UnsupportedCharacter {
            ch: c,
            text: text.to_string(),
        });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

struct UnitParser<'a> {
    tokens: Vec<String>,
    index: usize,
    text: &'a str,
}

impl UnitParser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.index).map(String::as_str)
    }

    fn peek_at(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.index + offset).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn end_error(&self) -> UnitParseError {
        UnitParseError::UnexpectedEnd {
            text: self.text.to_string(),
        }
    }

    fn overflow_error(&self) -> UnitParseError {
        UnitParseError::ExponentOverflow {
            text: self.text.to_string(),
        }
    }

    // expression := term (('*' | '/') term)*
    fn expression(&mut self) -> Result<Dimension, UnitParseError> {
        let mut result = self.term()?;
        while let Some(op) = self.peek() {
            let multiply = match op {
                "*" => true,
                "/" => false,
                _ => break,
            };
            self.index += 1;
            let rhs = self.term()?;
            let combined = if multiply {
                result.checked_mul(&rhs)
            } else {
                result.checked_div(&rhs)
            };
            result = combined.ok_or_else(|| self.overflow_error())?;
        }
        Ok(result)
    }

    // term := factor ['^' exponent]
    fn term(&mut self) -> Result<Dimension, UnitParseError> {
        let base = self.factor()?;
        if self.peek() == Some("^") {
            self.index += 1;
            let power = self.exponent()?;
            return base.checked_powr(power).ok_or_else(|| self.overflow_error());
        }
        Ok(base)
    }

    fn factor(&mut self) -> Result<Dimension, UnitParseError> {
        let token = self.next().ok_or_else(|| self.end_error())?;
        if token == "(" {
            let inner = self.expression()?;
            if self.next().as_deref() != Some(")") {
                return Err(UnitParseError::MissingParen {
                    text: self.text.to_string(),
                });
            }
            return Ok(inner);
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Dimension::dimensionless());
        }
        if let Some(dim) = Dimension::base(&token) {
            return Ok(dim);
        }
        if CELSIUS_ALIASES.contains(&token.as_str()) {
            return Ok(Dimension::base("K").unwrap_or_default());
        }
        if let Some((_, definition)) = DERIVED_UNITS.iter().find(|(sym, _)| *sym == token) {
            return parse_unit_expression(definition);
        }
        Err(UnitParseError::UnknownUnit {
            token,
            text: self.text.to_string(),
        })
    }

    /// exponent := ['-'] int ['/' int] | '(' ['-'] int ['/' int] ')'
    fn exponent(&mut self) -> Result<Rational64, UnitParseError> {
        let parenthesized = self.peek() == Some("(");
        if parenthesized {
            self.index += 1;
        }

        let negative = self.peek() == Some("-");
        if negative {
            self.index += 1;
        }

        let numer_token = self.next().ok_or_else(|| self.end_error())?;
        let numer = self.integer(&numer_token)?;

        // `m^1/2` reads as a fractional exponent only when an integer follows
        let mut denom = 1;
        let fraction_follows = self.peek() == Some("/")
            && self
                .peek_at(1)
                .is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()));
        if fraction_follows {
            self.index += 1;
            let denom_token = self.next().ok_or_else(|| self.end_error())?;
            denom = self.integer(&denom_token)?;
            if denom == 0 {
                return Err(self.invalid_exponent(format!("{}/{}", numer_token, denom_token)));
            }
        }

        if parenthesized && self.next().as_deref() != Some(")") {
            return Err(UnitParseError::MissingParen {
                text: self.text.to_string(),
            });
        }

        let value = Rational64::new(numer, denom);
        Ok(if negative { -value } else { value })
    }

    fn integer(&self, token: &str) -> Result<i64, UnitParseError> {
        token
            .parse::<i64>()
            .map_err(|_| self.invalid_exponent(token.to_string()))
    }

    fn invalid_exponent(&self, exponent: String) -> UnitParseError {
        UnitParseError::InvalidExponent {
            exponent,
            text: self.text.to_string(),
        }
    }
}
