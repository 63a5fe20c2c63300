use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    ops::BitOr,
};

use crate::{evr::Evr, ParseError, StringId};

/// The comparison part of a [`Relation`], a set of the flags `LT`, `EQ` and
/// `GT`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationOp(u8);

impl RelationOp {
    /// Strictly greater
    pub const GT: RelationOp = RelationOp(1);
    /// Equal
    pub const EQ: RelationOp = RelationOp(2);
    /// Strictly less
    pub const LT: RelationOp = RelationOp(4);
    /// Greater or equal
    pub const GE: RelationOp = RelationOp(1 | 2);
    /// Less or equal
    pub const LE: RelationOp = RelationOp(4 | 2);

    /// Returns true if all flags of `other` are also set in `self`.
    pub fn contains(self, other: RelationOp) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parses one of `<`, `<=`, `=`, `==`, `>=` or `>`.
    pub fn parse(op: &str) -> Result<Self, ParseError> {
        match op {
            "<" => Ok(Self::LT),
            "<=" | "=<" => Ok(Self::LE),
            "=" | "==" => Ok(Self::EQ),
            ">=" | "=>" => Ok(Self::GE),
            ">" => Ok(Self::GT),
            _ => Err(ParseError::InvalidOperator(op.to_owned())),
        }
    }

    /// Returns true if a version ordered `ordering` relative to the
    /// comparison version is accepted.
    fn accepts(self, ordering: Ordering) -> bool {
        match ordering {
            Ordering::Less => self.contains(Self::LT),
            Ordering::Equal => self.contains(Self::EQ),
            Ordering::Greater => self.contains(Self::GT),
        }
    }
}

impl BitOr for RelationOp {
    type Output = RelationOp;

    fn bitor(self, rhs: Self) -> Self::Output {
        RelationOp(self.0 | rhs.0)
    }
}

impl Display for RelationOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let op = match self.0 {
            1 => ">",
            2 => "=",
            3 => ">=",
            4 => "<",
            5 => "<>",
            6 => "<=",
            7 => "<=>",
            _ => "",
        };
        f.write_str(op)
    }
}

/// A dependency expression: a name, optionally constrained by a comparison
/// against a version. Relations are interned in the [`crate::Pool`] and
/// referred to by [`crate::RelationId`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// The name that is required, provided, conflicted with or obsoleted
    pub name: StringId,

    /// The version constraint, `None` matches every version of `name`
    pub constraint: Option<(RelationOp, StringId)>,
}

/// The textual parts of a relation expression, before interning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParsedRelation<'a> {
    pub name: &'a str,
    pub constraint: Option<(RelationOp, &'a str)>,
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '<' | '=' | '>')
}

/// Splits `name [op evr]` into its parts. Whitespace around the operator is
/// optional.
pub(crate) fn parse_relation(text: &str) -> Result<ParsedRelation<'_>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let name_end = text.find(|c| !is_name_char(c)).unwrap_or(text.len());
    let name = &text[..name_end];
    if name.is_empty() {
        return Err(ParseError::InvalidName(text.to_owned()));
    }

    let rest = text[name_end..].trim_start();
    if rest.is_empty() {
        return Ok(ParsedRelation {
            name,
            constraint: None,
        });
    }

    let op_end = rest
        .find(|c| !matches!(c, '<' | '=' | '>'))
        .unwrap_or(rest.len());
    if op_end == 0 {
        return Err(ParseError::TrailingInput(rest.to_owned()));
    }
    let op = RelationOp::parse(&rest[..op_end])?;

    let rest = rest[op_end..].trim_start();
    let evr_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let evr = &rest[..evr_end];
    if evr.is_empty() {
        return Err(ParseError::MissingVersion(op.to_string()));
    }
    Evr::parse(evr)?;

    let trailing = rest[evr_end..].trim();
    if !trailing.is_empty() {
        return Err(ParseError::TrailingInput(trailing.to_owned()));
    }

    Ok(ParsedRelation {
        name,
        constraint: Some((op, evr)),
    })
}

/// Returns true if the version `evr` lies in the range `op constraint`.
pub(crate) fn version_matches(evr: &Evr<'_>, op: RelationOp, constraint: &Evr<'_>) -> bool {
    op.accepts(evr.match_cmp(constraint))
}

/// Returns true if there is a version accepted by both ranges. This is how a
/// versioned provide is matched against a versioned requirement.
pub(crate) fn ranges_intersect(
    (op_a, evr_a): (RelationOp, &Evr<'_>),
    (op_b, evr_b): (RelationOp, &Evr<'_>),
) -> bool {
    match evr_a.match_cmp(evr_b) {
        // Both ranges contain a common point
        Ordering::Equal => {
            (op_a.contains(RelationOp::EQ) && op_b.contains(RelationOp::EQ))
                || (op_a.contains(RelationOp::LT) && op_b.contains(RelationOp::LT))
                || (op_a.contains(RelationOp::GT) && op_b.contains(RelationOp::GT))
        }
        // a's version is below b's: a must reach up or b must reach down
        Ordering::Less => op_a.contains(RelationOp::GT) || op_b.contains(RelationOp::LT),
        Ordering::Greater => op_a.contains(RelationOp::LT) || op_b.contains(RelationOp::GT),
    }
}
