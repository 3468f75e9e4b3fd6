//! Contentsieve Core
//!
//! This crate provides the error type, decision values and small shared
//! helpers used by every contentsieve filter.
//!
//! # Overview
//!
//! The core crate contains:
//! - [`FilterError`] - Error types, [`Result`] alias
//! - [`Verdict`] - Abstain / replace / drop decisions returned by policies
//! - [`ContentType`] - MIME type splitting

pub mod error;
pub mod mime;
pub mod verdict;

pub use error::{FilterError, Result};
pub use mime::ContentType;
pub use verdict::Verdict;
