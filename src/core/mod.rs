//! Core types for fleetrender.
//!
//! Home of the error system shared by the resolution engine and the CLI:
//! - [`FleetError`] - strongly-typed error variants for all failure modes
//! - [`ErrorContext`] - user-friendly wrapper with suggestions and details
//! - [`user_friendly_error`] - convert any error to the user-facing format
//!
//! Every operation that can fail returns a [`Result`] with meaningful error
//! information; user-facing errors include contextual suggestions.

pub mod error;

pub use error::{ErrorContext, FleetError, Result, user_friendly_error};
