// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error type shared by every trajseg crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegError {
    /// Caller-provided data or configuration violates a documented contract.
    InvalidInput(String),
    /// A floating-point computation produced a non-finite or unusable value.
    NumericalIssue(String),
    /// The requested mode exists but is not implemented for this path.
    NotSupported(String),
    /// A counter, index, or allocation bound would overflow.
    ResourceLimit(String),
}

impl SegError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Prefixes the message with `context`, keeping the variant.
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            Self::InvalidInput(msg) => Self::InvalidInput(format!("{context}: {msg}")),
            Self::NumericalIssue(msg) => Self::NumericalIssue(format!("{context}: {msg}")),
            Self::NotSupported(msg) => Self::NotSupported(format!("{context}: {msg}")),
            Self::ResourceLimit(msg) => Self::ResourceLimit(format!("{context}: {msg}")),
        }
    }

    /// Stable machine-readable code, used in JSON error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }
}

impl fmt::Display for SegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NumericalIssue(msg) => write!(f, "numerical issue: {msg}"),
            Self::NotSupported(msg) => write!(f, "not supported: {msg}"),
            Self::ResourceLimit(msg) => write!(f, "resource limit: {msg}"),
        }
    }
}

impl std::error::Error for SegError {}

/// Increments `counter`, reporting overflow as [`SegError::ResourceLimit`].
pub fn checked_counter_increment(counter: &mut usize, name: &str) -> Result<(), SegError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| SegError::resource_limit(format!("{name} counter overflow")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SegError, checked_counter_increment};

    #[test]
    fn display_prefixes_variant_kind() {
        let err = SegError::invalid_input("sequence must be non-empty");
        assert_eq!(err.to_string(), "invalid input: sequence must be non-empty");
        assert_eq!(err.code(), "invalid_input");

        let err = SegError::resource_limit("merge counter overflow");
        assert!(err.to_string().starts_with("resource limit:"));
        assert_eq!(err.code(), "resource_limit");
    }

    #[test]
    fn checked_counter_increment_reports_overflow() {
        let mut counter = 3usize;
        checked_counter_increment(&mut counter, "merges").expect("increment should succeed");
        assert_eq!(counter, 4);

        let mut saturated = usize::MAX;
        let err = checked_counter_increment(&mut saturated, "merges")
            .expect_err("overflow should be reported");
        assert!(matches!(err, SegError::ResourceLimit(_)));
        assert!(err.to_string().contains("merges counter overflow"));
    }

    #[test]
    fn with_context_keeps_the_variant() {
        let err = SegError::numerical_issue("non-finite mean").with_context("trajectory 3");
        assert!(matches!(err, SegError::NumericalIssue(_)));
        assert_eq!(err.to_string(), "numerical issue: trajectory 3: non-finite mean");
    }
}
