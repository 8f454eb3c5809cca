//! # Keneth Support
//!
//! Shared helpers for the Keneth DI crates.
//!
//! Currently this is the text rendering used by error messages:
//! cycle chains, shortened type names and "did you mean?" hints.

pub mod rendering;
