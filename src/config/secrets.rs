//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for store credentials.

pub use secrecy::{ExposeSecret, SecretString};
