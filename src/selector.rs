//! Anchored name selectors for clusters and applications.
//!
//! Selection patterns given on the command line are regular expressions
//! that must match an entire name, not a substring: `echo` selects exactly
//! the application `echo`, while `echo-.*` selects every name with that
//! prefix. Anchoring happens here so every caller gets the same semantics.

use regex::Regex;

use crate::core::{FleetError, Result};

/// Compiles `pattern` into a full-string matcher (`^pattern$`).
pub fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^{pattern}$")).map_err(|e| FleetError::InvalidSelector {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
