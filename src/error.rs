//! Errors returned by the parsing and lookup operations of a [`crate::Pool`].

use thiserror::Error;

/// Returned when a relation expression or version string cannot be interned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input was empty or contained only whitespace.
    #[error("empty expression")]
    Empty,

    /// The name part of a relation is missing or contains illegal characters.
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// The comparison operator is not one of `<`, `<=`, `=`, `>=`, `>`.
    #[error("unknown comparison operator '{0}'")]
    InvalidOperator(String),

    /// An operator was given without the version it compares against.
    #[error("missing version after '{0}'")]
    MissingVersion(String),

    /// The version string is not of the form `[epoch:]version[-release]`.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// Trailing input after an otherwise complete relation.
    #[error("unexpected trailing input '{0}'")]
    TrailingInput(String),
}

/// Returned when a solvable cannot be added to a [`crate::Pool`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The name or version of the solvable could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The target repository does not exist or was freed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Returned by the lookup operations of the query API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// An index based lookup was out of range.
    #[error("no solvable at index {index}, only {len} available")]
    NoSuchIndex {
        /// The requested index
        index: usize,
        /// The number of solvables that could have been addressed
        len: usize,
    },

    /// No solvable with the requested name exists.
    #[error("no solvable named '{0}'")]
    NotFound(String),

    /// The repository does not exist or was freed.
    #[error("no such repository")]
    NoSuchRepo,
}
