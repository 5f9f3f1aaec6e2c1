//! The error taxonomy shared by every backend and by the facade.
//!
//! `rkyv` parameterizes its fallible operations over a generic
//! `rancor::Fallible::Error` so that callers can plug in their own error
//! representation. BitSerializer doesn't need that generality: the spec
//! defines one closed taxonomy (parsing, shape mismatch, overflow, out of
//! range, UTF transcoding, unsupported encoding, I/O, validation), so a
//! single concrete `thiserror` enum is the idiomatic fit.

/// A location inside a document, following RFC-6901-style pointer syntax:
/// ancestor keys joined by the archive's path separator, with array indices
/// written as decimal segments.
pub type Path = String;

/// Where a [`Error::Parsing`] error was detected, when the backend can say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseLocation {
    /// Byte offset from the start of the input, if known.
    pub offset: Option<usize>,
    /// 1-based line number, if known.
    pub line: Option<usize>,
    /// 1-based column number, if known.
    pub column: Option<usize>,
}

impl ParseLocation {
    /// A location with nothing known about it.
    pub const UNKNOWN: Self = Self { offset: None, line: None, column: None };

    /// A location with only a byte offset.
    pub fn at_offset(offset: usize) -> Self {
        Self { offset: Some(offset), ..Self::UNKNOWN }
    }

    /// A location with a line and column.
    pub fn at_line_col(line: usize, column: usize) -> Self {
        Self { line: Some(line), column: Some(column), ..Self::UNKNOWN }
    }
}

/// One `(path, messages)` entry accumulated by the validator pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Path of the field that failed validation.
    pub path: Path,
    /// Every validator message collected for that path, in declared order.
    pub messages: Vec<String>,
}

/// The taxonomy from spec §4.8 / §7.
///
/// `MismatchedTypes`, `Overflow`, and `UtfEncodingError` are only ever
/// constructed by the engine when the corresponding policy is
/// [`crate::options::Policy::ThrowError`] — under `Skip` those conditions are
/// swallowed and surface later (if at all) as [`Error::FailedValidation`]
/// through a `Required` validator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backend failed to parse its input. Always thrown, never subject to
    /// a policy.
    #[error("parsing error at {path}{location}: {message}", location = format_location(.location))]
    Parsing {
        /// Path at which parsing failed, if the backend can localize it.
        path: Path,
        /// Offset/line/column, as available.
        location: ParseLocation,
        /// Backend-supplied description.
        message: String,
    },

    /// The archive value at `path` was not shape-compatible with the target
    /// type (e.g. loading an object into a `Vec<T>`).
    #[error("mismatched types at {path}: {message}")]
    MismatchedTypes {
        /// Path at which the mismatch occurred.
        path: Path,
        /// Human-readable detail.
        message: String,
    },

    /// A number or duration did not fit the target representation.
    #[error("overflow at {path}: {message}")]
    Overflow {
        /// Path at which the overflow occurred.
        path: Path,
        /// Human-readable detail.
        message: String,
    },

    /// An array scope was read past its declared end.
    #[error("out of range at {path}: index {index} >= size {size}")]
    OutOfRange {
        /// Path of the array scope.
        path: Path,
        /// The index that was requested.
        index: usize,
        /// The declared size of the array.
        size: usize,
    },

    /// A string transcoding step encountered an invalid byte sequence.
    #[error("UTF encoding error at {path}: {message}")]
    UtfEncodingError {
        /// Path at which the error occurred.
        path: Path,
        /// Human-readable detail.
        message: String,
    },

    /// A requested stream encoding is not supported by the backend.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// File or stream I/O failed.
    #[error("I/O error: {0}")]
    InputOutputError(String),

    /// One or more validators failed during `Load`. Carries every failure
    /// accumulated in the [`crate::context::SerializationContext`], not just
    /// the first.
    #[error("validation failed: {} field(s)", .0.len())]
    FailedValidation(Vec<ValidationFailure>),
}

fn format_location(location: &ParseLocation) -> String {
    match (location.line, location.column, location.offset) {
        (Some(line), Some(col), _) => format!(" ({line}:{col})"),
        (_, _, Some(offset)) => format!(" (byte {offset})"),
        _ => String::new(),
    }
}

impl Error {
    /// The path this error is attached to, if it has one.
    ///
    /// [`Error::UnsupportedEncoding`], [`Error::InputOutputError`], and
    /// [`Error::FailedValidation`] are not attached to a single path.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Parsing { path, .. }
            | Self::MismatchedTypes { path, .. }
            | Self::Overflow { path, .. }
            | Self::OutOfRange { path, .. }
            | Self::UtfEncodingError { path, .. } => Some(path),
            Self::UnsupportedEncoding(_)
            | Self::InputOutputError(_)
            | Self::FailedValidation(_) => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
