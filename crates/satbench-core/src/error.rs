//! Error types for log parsing and cross-run comparison
//!
//! Every failure is unrecoverable at the point of detection: a malformed log
//! or an inconsistent batch invalidates the whole experiment, so nothing here
//! carries a "partial result" payload.

/// Errors raised while parsing a single solver log.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// A recognized line tag with the wrong token count or a value token
    /// that does not parse as the expected numeric type
    #[error("line {line}: malformed '{tag}' line: {detail}")]
    FormatViolation {
        line: usize,
        tag: &'static str,
        detail: String,
    },

    /// Objective / time / restart-counter / bound ordering broken
    #[error("monotonicity violated: {context}")]
    MonotonicityViolation { context: String },

    /// An optimality proof where only time-limited, truncated runs are expected
    #[error("unexpected optimality proof: {context}")]
    UnexpectedOptimalProof { context: String },

    /// The log text itself reports a solver-side failure
    #[error("line {line}: log carries error marker '{marker}'")]
    EmbeddedErrorMarker { line: usize, marker: &'static str },
}

/// Errors raised while comparing runs, batches, or summaries.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// The compared batches do not cover the same instance names
    #[error("instance sets differ: {detail}")]
    InstanceSetMismatch { detail: String },

    /// An instance was run a different number of times in each batch
    #[error("instance '{instance}': run counts differ ({left} vs {right})")]
    RunCountMismatch {
        instance: String,
        left: usize,
        right: usize,
    },

    /// A summary/config does not cover every instance in the comparison
    #[error("'{label}' covers {found} of {expected} instances")]
    MissingInstanceCoverage {
        label: String,
        expected: usize,
        found: usize,
    },

    /// Score tables need at least two sides to compare
    #[error("need at least two summaries to compare, got {found}")]
    TooFewSummaries { found: usize },
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for comparison operations
pub type CompareResult<T> = Result<T, CompareError>;
