//! Error types and result definitions for the granite scan engine.
//!
//! All granite crates share a single error enum ([`Error`]) and result alias
//! ([`Result<T>`]). Fallible operations return `Result<T>` and propagate with
//! the `?` operator; there is no retry machinery anywhere in the engine. Every
//! operation is synchronous, deterministic and local, so an error always means
//! either a caller bug ([`Error::ContractViolation`]) or a predicate/encoding
//! combination the engine does not evaluate ([`Error::Unsupported`]).

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
