//! # Armory Support
//!
//! Shared utilities for the Armory DI kernel.
//!
//! This crate provides:
//! - Text rendering for diagnostic messages (identifier chains, candidate lists)
//! - Type name shortening and "did you mean?" suggestions

pub mod rendering;
