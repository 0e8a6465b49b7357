//! Lease key naming.
//!
//! Keys are `{prefix}:{subject}:lock`.  Every process sharing a store must
//! use the same prefix and the same rendering of the subject, otherwise the
//! lock namespace silently splits.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseKeys {
    prefix: String,
}

impl LeaseKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, subject: impl Display) -> String {
        format!("{}:{}:lock", self.prefix, subject)
    }

    /// Glob matching every lease key under this prefix.
    pub fn pattern(&self) -> String {
        format!("{}:*:lock", self.prefix)
    }
}
