//! SCIM 2.0 Filter Parser and Evaluator
//!
//! This module implements a parser for SCIM filter expressions per RFC 7644 Section 3.4.2,
//! and evaluates parsed filters against resources exposed through [`Filterable`].
//!
//! ## Grammar (simplified)
//!
//! ```text
//! filter     = logExpr
//! logExpr    = andExpr { "or" andExpr }
//! andExpr    = notExpr { "and" notExpr }
//! notExpr    = "not" "(" filter ")" | "(" filter ")" | attrExpr
//! attrExpr   = attrPath "pr" | attrPath compareOp compValue
//! attrPath   = ATTRNAME ["[" valFilter "]"] ["." ATTRNAME]
//! valFilter  = attrPath compareOp compValue
//! compareOp  = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! compValue  = "true" | "false" | NUMBER | STRING
//! ```
//!
//! Keywords and operators are case-insensitive, so `AND`/`and` and `EQ`/`eq` are
//! equivalent. Attribute names are matched case-insensitively during evaluation.
//!
//! ## Examples
//!
//! ```text
//! userName eq "john"
//! active eq true
//! name.familyName co "doe"
//! emails[primary eq true].value sw "john"
//! (userName eq "user3") OR (displayName eq "First Middle Last")
//! not (active eq false)
//! ```
//!
//! ## Comparison Semantics
//!
//! - Strings compare case-sensitively and exactly.
//! - Booleans and numbers compare by value; booleans only support `eq` and `ne`.
//! - A literal of a different type than the attribute never matches, so
//!   `active eq "true"` is false.
//! - An attribute that is not present never satisfies a comparison.
//! - A multi-valued attribute matches when any of its elements matches. Without a
//!   sub-attribute the element's `value` is compared.
//!
//! ## Security Limits
//!
//! To prevent DoS attacks from malicious filter expressions:
//! - Maximum filter length: 4096 bytes
//! - Maximum nesting depth: 32 levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed length of a SCIM filter expression (bytes).
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Maximum allowed nesting depth of a SCIM filter expression.
pub const MAX_FILTER_DEPTH: usize = 32;

/// A parsed SCIM filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute comparison (e.g., `userName eq "john"`)
    Compare {
        attr: AttrPath,
        op: CompareOp,
        value: FilterValue,
    },
    /// Attribute presence check (e.g., `name pr`)
    Present { attr: AttrPath },
    /// Logical AND of two filters
    And(Box<Filter>, Box<Filter>),
    /// Logical OR of two filters
    Or(Box<Filter>, Box<Filter>),
    /// Logical NOT of a filter
    Not(Box<Filter>),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { attr, op, value } => write!(f, "{} {} {}", attr, op, value),
            Filter::Present { attr } => write!(f, "{} pr", attr),
            Filter::And(left, right) => write!(f, "({} and {})", left, right),
            Filter::Or(left, right) => write!(f, "({} or {})", left, right),
            Filter::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

impl Filter {
    /// Evaluate this filter against a resource.
    pub fn matches(&self, target: &dyn Filterable) -> bool {
        matches_filter(self, target)
    }

    /// String equality predicates on plain attributes that every match must satisfy.
    ///
    /// Walks the top-level chain of `and` nodes and returns `(attribute, literal)`
    /// for each `attr eq "literal"` found there. Anything under `or` or `not` is
    /// skipped, so each returned predicate is a necessary condition of the whole
    /// filter and can safely narrow a candidate query.
    pub fn required_equalities(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        collect_required_equalities(self, &mut out);
        out
    }
}

fn collect_required_equalities<'a>(filter: &'a Filter, out: &mut Vec<(&'a str, &'a str)>) {
    match filter {
        Filter::Compare {
            attr,
            op: CompareOp::Eq,
            value: FilterValue::String(literal),
        } if attr.is_simple() => out.push((attr.attr.as_str(), literal.as_str())),
        Filter::And(left, right) => {
            collect_required_equalities(left, out);
            collect_required_equalities(right, out);
        }
        _ => {}
    }
}

/// An attribute path, optionally with sub-attribute and value filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrPath {
    /// Main attribute name (e.g., "userName", "emails")
    pub attr: String,
    /// Sub-attribute for complex types (e.g., "familyName" in "name.familyName")
    pub sub_attr: Option<String>,
    /// Value filter for multi-valued attributes (e.g., `[primary eq true]`)
    pub value_filter: Option<Box<Filter>>,
}

impl AttrPath {
    /// Create a simple attribute path
    pub fn simple(attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            sub_attr: None,
            value_filter: None,
        }
    }

    /// Create a nested attribute path (e.g., "name.familyName")
    pub fn nested(attr: impl Into<String>, sub_attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            sub_attr: Some(sub_attr.into()),
            value_filter: None,
        }
    }

    /// True when the path has neither a sub-attribute nor a value filter.
    pub fn is_simple(&self) -> bool {
        self.sub_attr.is_none() && self.value_filter.is_none()
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attr)?;
        if let Some(filter) = &self.value_filter {
            write!(f, "[{}]", filter)?;
        }
        if let Some(sub) = &self.sub_attr {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// Comparison operators per RFC 7644.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        };
        write!(f, "{}", s)
    }
}

impl CompareOp {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

/// Filter comparison values.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Bool(bool),
    Number(f64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Filter parsing error.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for FilterParseError {}

/// Parse a SCIM filter expression.
///
/// # Errors
///
/// Returns an error if:
/// - The filter exceeds [`MAX_FILTER_LENGTH`] bytes
/// - The filter exceeds [`MAX_FILTER_DEPTH`] nesting levels
/// - The filter has invalid syntax
///
/// # Examples
///
/// ```
/// use scimgate::scim::filter::parse_filter;
///
/// let filter = parse_filter("userName eq \"john\"").unwrap();
/// let filter = parse_filter("(userName eq \"a\") OR (displayName eq \"B C\")").unwrap();
/// ```
pub fn parse_filter(input: &str) -> Result<Filter, FilterParseError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterParseError {
            message: format!(
                "Filter exceeds maximum length ({} bytes, max {})",
                input.len(),
                MAX_FILTER_LENGTH
            ),
            position: 0,
        });
    }

    let mut parser = Parser::new(input);
    let filter = parser.parse_filter()?;

    // Ensure we consumed all input
    parser.skip_whitespace();
    if parser.position < parser.input.len() {
        return Err(FilterParseError {
            message: format!("Unexpected input: '{}'", &parser.input[parser.position..]),
            position: parser.position,
        });
    }

    Ok(filter)
}

// =============================================================================
// Evaluation
// =============================================================================

/// An attribute value as seen by the filter evaluator.
pub enum Attribute<'a> {
    /// Not present on the resource
    Absent,
    String(&'a str),
    Bool(bool),
    Number(f64),
    /// Single-valued complex attribute (e.g. `name`)
    Complex(&'a dyn Filterable),
    /// Multi-valued complex attribute (e.g. `emails`)
    Multi(Vec<&'a dyn Filterable>),
}

/// A resource, or a complex attribute of one, that filters can be evaluated against.
///
/// Implementations resolve one attribute name at a time. Names arrive as
/// written in the filter, so implementations must compare them
/// case-insensitively.
pub trait Filterable {
    fn attribute(&self, name: &str) -> Attribute<'_>;
}

/// Evaluate a filter against a resource.
///
/// Evaluation is total and side-effect free. `and`/`or` short-circuit left to right.
pub fn matches_filter(filter: &Filter, target: &dyn Filterable) -> bool {
    match filter {
        Filter::Compare { attr, op, value } => resolve_path(target, attr)
            .iter()
            .any(|v| compare_values(v, *op, value)),
        Filter::Present { attr } => resolve_path(target, attr).iter().any(is_present),
        Filter::And(left, right) => matches_filter(left, target) && matches_filter(right, target),
        Filter::Or(left, right) => matches_filter(left, target) || matches_filter(right, target),
        Filter::Not(inner) => !matches_filter(inner, target),
    }
}

/// Resolve a path to the set of values it addresses.
///
/// Scalars resolve to themselves. Multi-valued attributes fan out into one value
/// per element that passes the value filter, read from the sub-attribute (or
/// `value` when none is given).
fn resolve_path<'a>(target: &'a dyn Filterable, path: &AttrPath) -> Vec<Attribute<'a>> {
    let elements = match target.attribute(&path.attr) {
        Attribute::Absent => return Vec::new(),
        Attribute::Complex(inner) => match &path.sub_attr {
            Some(sub) if path.value_filter.is_none() => return vec![inner.attribute(sub)],
            Some(_) => vec![inner],
            None if path.value_filter.is_none() => return vec![Attribute::Complex(inner)],
            None => vec![inner],
        },
        Attribute::Multi(items) => items,
        scalar => {
            return if path.is_simple() {
                vec![scalar]
            } else {
                Vec::new()
            };
        }
    };

    elements
        .into_iter()
        .filter(|item| {
            path.value_filter
                .as_ref()
                .is_none_or(|vf| matches_filter(vf, *item))
        })
        .map(|item| match &path.sub_attr {
            Some(sub) => item.attribute(sub),
            None if path.value_filter.is_some() => Attribute::Complex(item),
            None => item.attribute("value"),
        })
        .collect()
}

fn is_present(value: &Attribute<'_>) -> bool {
    match value {
        Attribute::Absent => false,
        Attribute::String(s) => !s.is_empty(),
        Attribute::Multi(items) => !items.is_empty(),
        Attribute::Bool(_) | Attribute::Number(_) | Attribute::Complex(_) => true,
    }
}

/// Numbers compare exactly: a literal equals an attribute only when both
/// parse to the same `f64`, with no tolerance at any magnitude.
fn compare_values(attr_value: &Attribute<'_>, op: CompareOp, filter_value: &FilterValue) -> bool {
    match (attr_value, filter_value) {
        (Attribute::String(s), FilterValue::String(fs)) => {
            let (s, fs) = (*s, fs.as_str());
            match op {
                CompareOp::Eq => s == fs,
                CompareOp::Ne => s != fs,
                CompareOp::Co => s.contains(fs),
                CompareOp::Sw => s.starts_with(fs),
                CompareOp::Ew => s.ends_with(fs),
                CompareOp::Gt => s > fs,
                CompareOp::Ge => s >= fs,
                CompareOp::Lt => s < fs,
                CompareOp::Le => s <= fs,
            }
        }
        (Attribute::Bool(b), FilterValue::Bool(fb)) => match op {
            CompareOp::Eq => b == fb,
            CompareOp::Ne => b != fb,
            _ => false,
        },
        (Attribute::Number(n), FilterValue::Number(fn_)) => match op {
            CompareOp::Eq => n == fn_,
            CompareOp::Ne => n != fn_,
            CompareOp::Gt => n > fn_,
            CompareOp::Ge => n >= fn_,
            CompareOp::Lt => n < fn_,
            CompareOp::Le => n <= fn_,
            _ => false,
        },
        _ => false,
    }
}

// =============================================================================
// Parser Implementation
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
        }
    }

    /// Enter a nested scope (parentheses, brackets, etc.).
    fn enter_scope(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterParseError {
                message: format!(
                    "Filter exceeds maximum nesting depth ({})",
                    MAX_FILTER_DEPTH
                ),
                position: self.position,
            });
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.parse_or_expr()
    }

    // logExpr = andExpr { "or" andExpr }
    fn parse_or_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_and_expr()?;

        while self.try_keyword("or") {
            let right = self.parse_and_expr()?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // andExpr = notExpr { "and" notExpr }
    fn parse_and_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_not_expr()?;

        while self.try_keyword("and") {
            let right = self.parse_not_expr()?;
            left = Filter::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // notExpr = "not" "(" filter ")" | "(" filter ")" | attrExpr
    fn parse_not_expr(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_keyword("not") {
            self.skip_whitespace();
            if !self.try_char('(') {
                return Err(FilterParseError {
                    message: "Expected '(' after 'not'".to_string(),
                    position: self.position,
                });
            }
            let inner = self.parse_grouped("Expected ')' to close 'not' expression")?;
            return Ok(Filter::Not(Box::new(inner)));
        }

        if self.try_char('(') {
            return self.parse_grouped("Expected ')' to close grouped expression");
        }

        self.parse_attr_expr()
    }

    /// Parse the inside of a parenthesized group; the '(' is already consumed.
    fn parse_grouped(&mut self, unclosed: &str) -> Result<Filter, FilterParseError> {
        self.enter_scope()?;
        let inner = self.parse_filter()?;
        self.exit_scope();
        self.skip_whitespace();
        if !self.try_char(')') {
            return Err(FilterParseError {
                message: unclosed.to_string(),
                position: self.position,
            });
        }
        Ok(inner)
    }

    // attrExpr = attrPath "pr" | attrPath compareOp compValue
    fn parse_attr_expr(&mut self) -> Result<Filter, FilterParseError> {
        let attr = self.parse_attr_path()?;
        self.parse_comparison(attr)
    }

    fn parse_comparison(&mut self, attr: AttrPath) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_keyword("pr") {
            return Ok(Filter::Present { attr });
        }

        let op = self.parse_compare_op()?;
        self.skip_whitespace();
        let value = self.parse_value()?;

        Ok(Filter::Compare { attr, op, value })
    }

    // attrPath = ATTRNAME ["[" valFilter "]"] ["." ATTRNAME]
    fn parse_attr_path(&mut self) -> Result<AttrPath, FilterParseError> {
        self.skip_whitespace();

        let attr = self.parse_attr_name()?;

        let value_filter = if self.try_char('[') {
            self.enter_scope()?;
            let filter = self.parse_value_filter()?;
            self.exit_scope();
            self.skip_whitespace();
            if !self.try_char(']') {
                return Err(FilterParseError {
                    message: "Expected ']' to close value filter".to_string(),
                    position: self.position,
                });
            }
            Some(Box::new(filter))
        } else {
            None
        };

        let sub_attr = if self.try_char('.') {
            Some(self.parse_attr_name()?)
        } else {
            None
        };

        Ok(AttrPath {
            attr,
            sub_attr,
            value_filter,
        })
    }

    // valFilter = attrPath compareOp compValue (no logical ops in value filter)
    fn parse_value_filter(&mut self) -> Result<Filter, FilterParseError> {
        let attr = self.parse_attr_path()?;
        self.parse_comparison(attr)
    }

    fn parse_attr_name(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;

        // Attribute names must start with a letter
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(FilterParseError {
                message: "Expected attribute name".to_string(),
                position: self.position,
            });
        }

        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.advance();
        }

        Ok(self.input[start..self.position].to_string())
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;

        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        let op_str = &self.input[start..self.position];

        CompareOp::from_str(op_str).ok_or_else(|| FilterParseError {
            message: if op_str.is_empty() {
                "Expected comparison operator".to_string()
            } else {
                format!("Unknown operator: '{}'", op_str)
            },
            position: start,
        })
    }

    fn parse_value(&mut self) -> Result<FilterValue, FilterParseError> {
        self.skip_whitespace();

        if self.peek() == Some('"') {
            return self.parse_string_value();
        }

        if self.try_keyword("true") {
            return Ok(FilterValue::Bool(true));
        }
        if self.try_keyword("false") {
            return Ok(FilterValue::Bool(false));
        }

        if self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return self.parse_number_value();
        }

        Err(FilterParseError {
            message: "Expected value (string, boolean, or number)".to_string(),
            position: self.position,
        })
    }

    fn parse_string_value(&mut self) -> Result<FilterValue, FilterParseError> {
        if !self.try_char('"') {
            return Err(FilterParseError {
                message: "Expected '\"' to start string".to_string(),
                position: self.position,
            });
        }

        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(FilterParseError {
                        message: "Unterminated string".to_string(),
                        position: self.position,
                    });
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let unescaped = match self.peek() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => {
                            return Err(FilterParseError {
                                message: "Invalid escape sequence".to_string(),
                                position: self.position,
                            });
                        }
                    };
                    value.push(unescaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(FilterValue::String(value))
    }

    fn parse_number_value(&mut self) -> Result<FilterValue, FilterParseError> {
        let start = self.position;

        if self.peek() == Some('-') || self.peek() == Some('+') {
            self.advance();
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek() == Some('-') || self.peek() == Some('+') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.position];
        num_str
            .parse::<f64>()
            .map(FilterValue::Number)
            .map_err(|_| FilterParseError {
                message: format!("Invalid number: '{}'", num_str),
                position: start,
            })
    }

    // Helper methods

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();

        let remaining = &self.input[self.position..];

        if remaining.len() >= keyword.len()
            && remaining.is_char_boundary(keyword.len())
            && remaining[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            // Make sure keyword is not part of a larger identifier
            let after_keyword = remaining[keyword.len()..].chars().next();
            if after_keyword.is_none_or(|c| !c.is_ascii_alphanumeric()) {
                self.position += keyword.len();
                return true;
            }
        }

        false
    }
}

// =============================================================================
// Tests
// =============================================================================
