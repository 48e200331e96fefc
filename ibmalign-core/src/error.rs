//! Error type shared by corpus loading, training and model export.

use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlignError {
    /// Corpus sides disagree or a sentence pair is malformed.
    InputMismatch(String),
    /// A normalizer summed to zero. `key` names the offending entry.
    DegenerateModel { table: &'static str, key: String },
    InvalidArgument(String),
    /// A count accumulator left the representable range.
    NumericOverflow(String),
    /// Training was stopped between iterations.
    Cancelled { completed: usize },
    /// Model records could not be read or written.
    Format(String),
}

pub type Result<T> = core::result::Result<T, AlignError>;

impl AlignError {
    pub(crate) fn degenerate(table: &'static str, key: impl Into<String>) -> Self {
        AlignError::DegenerateModel { table, key: key.into() }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, AlignError::DegenerateModel { .. })
    }
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::InputMismatch(msg) => write!(f, "input mismatch: {msg}"),
            AlignError::DegenerateModel { table, key } => {
                write!(f, "degenerate model: {table} has no probability mass for {key}")
            }
            AlignError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            AlignError::NumericOverflow(msg) => write!(f, "numeric overflow: {msg}"),
            AlignError::Cancelled { completed } => {
                write!(f, "training cancelled after {completed} iteration(s)")
            }
            AlignError::Format(msg) => write!(f, "model format: {msg}"),
        }
    }
}

impl std::error::Error for AlignError {}

impl From<serde_json::Error> for AlignError {
    fn from(e: serde_json::Error) -> Self {
        AlignError::Format(e.to_string())
    }
}

impl From<std::io::Error> for AlignError {
    fn from(e: std::io::Error) -> Self {
        AlignError::Format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_message_names_key() {
        let e = AlignError::degenerate("total(f)", "\"orphan\"");
        assert!(e.is_degenerate());
        assert_eq!(
            e.to_string(),
            "degenerate model: total(f) has no probability mass for \"orphan\""
        );
    }
}
