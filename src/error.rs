//! Caller-facing errors. Internal and transient faults degrade gracefully
//! and are logged; these variants are contract violations that must be
//! surfaced instead of silently absorbed.

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("batch must contain between {min} and {max} emails, got {actual}")]
    BatchSize {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("email at index {index} has no sender and an empty body")]
    MissingContent { index: usize },
}
