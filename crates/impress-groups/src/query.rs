//! Structured search query grammar used by search groups.
//!
//! Grammar:
//! ```text
//! query    := or_expr
//! or_expr  := and_expr (('or' | '|') and_expr)*
//! and_expr := unary (('and' | '&')? unary)*
//! unary    := ('not' | '!' | '-') unary | atom
//! atom     := '(' or_expr ')' | term
//! term     := field op value | value
//! op       := '==' | '!=' | '=' | ':'
//! value    := '"' text '"' | word
//! ```
//!
//! Keywords are case-insensitive. Juxtaposed terms are combined with AND.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, value, verify},
    multi::many0,
    sequence::{delimited, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::normalize_field_name;

/// Parse errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Empty query")]
    Empty,

    #[error("Unexpected input at: '{0}'")]
    Trailing(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// How a term compares its value with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermOp {
    /// Field contains the value
    Contains,
    /// Field equals the value
    Exact,
    /// Field does not contain the value
    NotContains,
}

/// Field a term is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermField {
    /// The configured search scope
    Default,
    /// Every field of the entry
    Any,
    /// The entry's identifying keys
    Key,
    /// A named field
    Named(String),
}

impl TermField {
    fn from_name(name: &str) -> Self {
        match normalize_field_name(name).as_str() {
            "any" | "anyfield" => TermField::Any,
            "key" | "citationkey" | "bibtexkey" => TermField::Key,
            other => TermField::Named(other.to_string()),
        }
    }
}

/// A single search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub field: TermField,
    pub op: TermOp,
    pub value: String,
}

impl Term {
    pub fn unfielded(value: impl Into<String>) -> Self {
        Self {
            field: TermField::Default,
            op: TermOp::Contains,
            value: value.into(),
        }
    }
}

/// Parsed query tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryExpr {
    And(Box<QueryExpr>, Box<QueryExpr>),
    Or(Box<QueryExpr>, Box<QueryExpr>),
    Not(Box<QueryExpr>),
    Term(Term),
}

impl QueryExpr {
    pub fn and(left: QueryExpr, right: QueryExpr) -> Self {
        QueryExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: QueryExpr, right: QueryExpr) -> Self {
        QueryExpr::Or(Box::new(left), Box::new(right))
    }

    pub fn not(expr: QueryExpr) -> Self {
        QueryExpr::Not(Box::new(expr))
    }

    /// Visit every term in the query.
    pub fn terms(&self) -> Vec<&Term> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            QueryExpr::And(a, b) | QueryExpr::Or(a, b) => {
                a.collect_terms(out);
                b.collect_terms(out);
            }
            QueryExpr::Not(inner) => inner.collect_terms(out),
            QueryExpr::Term(term) => out.push(term),
        }
    }
}

/// Parse a structured query.
pub fn parse_query(input: &str) -> Result<QueryExpr, QueryError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::Empty);
    }

    match or_expr(input) {
        Ok((rest, expr)) if rest.trim().is_empty() => Ok(expr),
        Ok((rest, _)) => Err(QueryError::Trailing(rest.trim().to_string())),
        Err(e) => Err(QueryError::Parse(format!("{:?}", e))),
    }
}

const RESERVED: &str = "()\"=!:&|";

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !RESERVED.contains(c)
}

fn is_keyword(word: &str) -> bool {
    ["and", "or", "not"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

/// Parse whitespace
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char)(input)
}

fn keyword<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    verify(word, move |w: &str| w.eq_ignore_ascii_case(name))
}

fn or_operator(input: &str) -> IResult<&str, ()> {
    ws(alt((value((), tag("|")), value((), keyword("or")))))(input)
}

fn and_operator(input: &str) -> IResult<&str, ()> {
    ws(alt((value((), tag("&")), value((), keyword("and")))))(input)
}

fn or_expr(input: &str) -> IResult<&str, QueryExpr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(or_operator, and_expr))(input)?;

    let result = rest.into_iter().fold(first, QueryExpr::or);
    Ok((input, result))
}

fn and_expr(input: &str) -> IResult<&str, QueryExpr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(alt((preceded(and_operator, unary), ws(unary))))(input)?;

    let result = rest.into_iter().fold(first, QueryExpr::and);
    Ok((input, result))
}

fn unary(input: &str) -> IResult<&str, QueryExpr> {
    ws(alt((
        map(preceded(ws(keyword("not")), unary), QueryExpr::not),
        map(preceded(char('!'), unary), QueryExpr::not),
        map(preceded(char('-'), unary), QueryExpr::not),
        atom,
    )))(input)
}

fn atom(input: &str) -> IResult<&str, QueryExpr> {
    alt((
        delimited(char('('), ws(or_expr), char(')')),
        map(term, QueryExpr::Term),
    ))(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    alt((fielded_term, map(term_value, Term::unfielded)))(input)
}

fn fielded_term(input: &str) -> IResult<&str, Term> {
    map(
        tuple((field_name, ws(term_op), term_value)),
        |(field, op, text)| Term {
            field: TermField::from_name(field),
            op,
            value: text,
        },
    )(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn term_op(input: &str) -> IResult<&str, TermOp> {
    alt((
        value(TermOp::Exact, tag("==")),
        value(TermOp::NotContains, tag("!=")),
        value(TermOp::Contains, tag("=")),
        value(TermOp::Contains, tag(":")),
    ))(input)
}

fn term_value(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            |s: &str| s.to_string(),
        ),
        map(verify(word, |w: &str| !is_keyword(w)), |w: &str| w.to_string()),
    ))(input)
}
