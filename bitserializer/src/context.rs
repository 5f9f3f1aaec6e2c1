//! Per-operation state shared by every scope of one root `Load`/`Save`.

use std::collections::BTreeMap;

use crate::error::{Path, ValidationFailure};

/// Accumulates validation errors keyed by path during one root-level `Load`.
///
/// A fresh `SerializationContext` is created at the start of every
/// [`crate::facade::LoadObject`]/[`crate::facade::SaveObject`] call and is
/// borrowed (never cloned) by every scope pushed during that traversal.
/// Spec §3: "Cleared at the start of every root-level Load/Save."
#[derive(Debug, Default)]
pub struct SerializationContext {
    errors: BTreeMap<Path, Vec<String>>,
}

impl SerializationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a validation failure message for `path`.
    ///
    /// Multiple validators attached to the same field each call this once;
    /// messages accumulate in call order rather than overwriting each other
    /// (spec §4.6: "Multiple validation errors per Load are accumulated, not
    /// short-circuited").
    pub fn add_error(&mut self, path: impl Into<Path>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        tracing::debug!(%path, %message, "validation failure recorded");
        self.errors.entry(path).or_default().push(message);
    }

    /// True once at least one error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Drains the accumulated errors into the ordered list that
    /// [`crate::error::Error::FailedValidation`] carries.
    pub fn take_failures(&mut self) -> Vec<ValidationFailure> {
        std::mem::take(&mut self.errors)
            .into_iter()
            .map(|(path, messages)| ValidationFailure { path, messages })
            .collect()
    }

    /// Resets the context to empty, as done at the start of every root
    /// operation.
    pub fn reset(&mut self) {
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_multiple_errors_per_path() {
        let mut ctx = SerializationContext::new();
        ctx.add_error("/age", "must be >= 0");
        ctx.add_error("/age", "is required");
        assert!(ctx.has_errors());
        let failures = ctx.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].messages.len(), 2);
        assert!(!ctx.has_errors());
    }

    #[test]
    fn empty_context_has_no_errors() {
        let ctx = SerializationContext::new();
        assert!(!ctx.has_errors());
    }
}
