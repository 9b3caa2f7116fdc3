use std::fmt;

use crate::error::{Error, Result};

/// One field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted, indexed path into the submitted value (`listen.0.ip`,
    /// `groups.2.auth`).
    pub field: String,
    pub message: String,
}

/// Accumulated validation failures for one call.
///
/// Validators return a collection instead of failing on the first problem,
/// so a caller sees everything wrong with its input in a single round trip.
/// Orchestrators merge the collections they gather and convert a non-empty
/// result into [`Error::Validation`] before touching storage.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Ok when nothing accumulated, `Error::Validation` otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_in_order() {
        let mut verrors = ValidationErrors::new();
        verrors.add("name", "cannot be empty");
        verrors.add("listen.0.ip", "not configured");

        assert_eq!(verrors.errors().len(), 2);
        assert_eq!(verrors.errors()[0].field, "name");
        assert_eq!(verrors.errors()[1].field, "listen.0.ip");
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationErrors::new();
        a.add("name", "bad");
        let mut b = ValidationErrors::new();
        b.add("alias", "taken");

        a.merge(b);
        assert_eq!(a.errors().len(), 2);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut verrors = ValidationErrors::new();
        verrors.add("secret", "too short");
        match verrors.into_result() {
            Err(Error::Validation(v)) => assert_eq!(v.errors()[0].field, "secret"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let mut verrors = ValidationErrors::new();
        verrors.add("name", "cannot be empty");
        verrors.add("mode", "Fibre Channel not enabled");
        assert_eq!(
            verrors.to_string(),
            "name: cannot be empty; mode: Fibre Channel not enabled"
        );
    }
}
