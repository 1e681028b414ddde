//! Row validation helpers.
//!
//! Mappers chain checks on a [`RowCheck`] and finish with
//! `Result<(), Vec<String>>`: every failed check adds one message, nothing
//! panics and nothing short-circuits.
//!
//! # Example
//!
//! ```rust,ignore
//! use woo_to_shopify::validation::RowCheck;
//!
//! RowCheck::new(&row)
//!     .required(&["comment_ID", "comment_post_ID"])
//!     .integer_in("rating", 1, 5)
//!     .finish()?;
//! ```

use crate::models::SourceRow;

/// Accumulates validation errors for one row.
#[derive(Debug)]
pub struct RowCheck<'a> {
    row: &'a SourceRow,
    errors: Vec<String>,
}

impl<'a> RowCheck<'a> {
    pub fn new(row: &'a SourceRow) -> Self {
        Self {
            row,
            errors: Vec::new(),
        }
    }

    /// Every column must hold a value.
    pub fn required(mut self, columns: &[&str]) -> Self {
        for column in columns {
            if !self.row.has(column) {
                self.errors.push(format!("Missing required field: {}", column));
            }
        }
        self
    }

    /// Column must be present and look like an email address.
    pub fn email(mut self, column: &str) -> Self {
        match self.row.text(column) {
            None => self.errors.push(format!("Missing required field: {}", column)),
            Some(email) if !email.contains('@') => {
                self.errors.push(format!("Invalid email: {}", email))
            }
            Some(_) => {}
        }
        self
    }

    /// When present, the column must be an integer within `[min, max]`.
    pub fn integer_in(mut self, column: &str, min: i64, max: i64) -> Self {
        let Some(text) = self.row.text(column) else {
            return self;
        };
        match self.row.number(column) {
            Some(n) if n.fract() == 0.0 && (min as f64..=max as f64).contains(&n) => {}
            Some(n) if n.fract() == 0.0 => self.errors.push(format!(
                "{} must be between {} and {}, got {}",
                column, min, max, text
            )),
            _ => self
                .errors
                .push(format!("{} must be an integer, got '{}'", column, text)),
        }
        self
    }

    /// When present, the column must be a non-negative number.
    pub fn non_negative(mut self, column: &str) -> Self {
        let Some(text) = self.row.text(column) else {
            return self;
        };
        match self.row.number(column) {
            Some(n) if n >= 0.0 => {}
            Some(_) => self.errors.push(format!("{} must not be negative, got {}", column, text)),
            None => self
                .errors
                .push(format!("{} must be a number, got '{}'", column, text)),
        }
        self
    }

    /// Arbitrary condition with its message.
    pub fn check(mut self, ok: bool, message: impl Into<String>) -> Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn test_required_collects_every_missing_field() {
        let row = SourceRow::from_pairs([("a", "1"), ("b", " ")]);
        let errors = RowCheck::new(&row)
            .required(&["a", "b", "c"])
            .finish()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains('b'));
        assert!(errors[1].contains('c'));
    }

    #[test]
    fn test_email() {
        let ok = SourceRow::from_pairs([("email", "ann@example.com")]);
        assert!(RowCheck::new(&ok).email("email").finish().is_ok());

        let bad = SourceRow::from_pairs([("email", "ann.example.com")]);
        assert!(RowCheck::new(&bad).email("email").finish().is_err());

        let missing = SourceRow::new();
        assert!(RowCheck::new(&missing).email("email").finish().is_err());
    }

    #[test]
    fn test_integer_in() {
        let mut row = SourceRow::new();
        row.insert("rating", Cell::Number(10.0));
        assert!(RowCheck::new(&row).integer_in("rating", 1, 5).finish().is_err());

        let row = SourceRow::from_pairs([("rating", "4")]);
        assert!(RowCheck::new(&row).integer_in("rating", 1, 5).finish().is_ok());

        let row = SourceRow::from_pairs([("rating", "4.5")]);
        assert!(RowCheck::new(&row).integer_in("rating", 1, 5).finish().is_err());

        let row = SourceRow::new();
        assert!(RowCheck::new(&row).integer_in("rating", 1, 5).finish().is_ok());
    }

    #[test]
    fn test_non_negative() {
        let row = SourceRow::from_pairs([("amount", "-1")]);
        assert!(RowCheck::new(&row).non_negative("amount").finish().is_err());

        let row = SourceRow::from_pairs([("amount", "abc")]);
        assert!(RowCheck::new(&row).non_negative("amount").finish().is_err());

        let row = SourceRow::from_pairs([("amount", "0")]);
        assert!(RowCheck::new(&row).non_negative("amount").finish().is_ok());
    }

    #[test]
    fn test_check() {
        let row = SourceRow::new();
        let errors = RowCheck::new(&row).check(false, "nope").finish().unwrap_err();
        assert_eq!(errors, vec!["nope".to_string()]);
    }
}
