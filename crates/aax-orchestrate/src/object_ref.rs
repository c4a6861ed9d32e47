//! Parsing of `kubectl -o name` object references using `nom`.
//!
//! Lines look like `deployment.apps/ee-base` or `service/ee-base`: a
//! resource kind, an optional API group, and the object name.

use std::fmt;

use aax_common::error::{AaxError, Result};
use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{all_consuming, opt},
    sequence::preceded,
};

/// A cluster object reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Lower-case resource kind, e.g. `deployment`.
    pub kind: String,
    /// API group, e.g. `apps`, absent for the core group.
    pub group: Option<String>,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Returns `true` if this refers to `name` of `kind`, ignoring the group.
    #[must_use]
    pub fn is(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}.{}/{}", self.kind, group, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

const fn is_kind_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

const fn is_group_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-'
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'
}

fn object_ref(input: &str) -> IResult<&str, ObjectRef> {
    let (input, kind) = take_while1(is_kind_char).parse(input)?;
    let (input, group) = opt(preceded(char('.'), take_while1(is_group_char))).parse(input)?;
    let (input, _) = tag("/").parse(input)?;
    let (input, name) = take_while1(is_name_char).parse(input)?;
    Ok((
        input,
        ObjectRef {
            kind: kind.to_string(),
            group: group.map(ToString::to_string),
            name: name.to_string(),
        },
    ))
}

/// Parses one `-o name` line.
///
/// # Errors
///
/// Returns an error if the line is not a `kind[.group]/name` reference.
pub fn parse_object_ref(line: &str) -> Result<ObjectRef> {
    let line = line.trim();
    all_consuming(object_ref)
        .parse(line)
        .map(|(_, r)| r)
        .map_err(|_| AaxError::config(format!("not an object reference: {line:?}")))
}

/// Parses every non-blank line of `-o name` output.
///
/// # Errors
///
/// Returns an error on the first malformed line.
pub fn parse_object_refs(output: &str) -> Result<Vec<ObjectRef>> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_object_ref)
        .collect()
}
