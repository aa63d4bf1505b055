//! # Domain Layer
//!
//! Key model, signature matching and verdict composition. No I/O; the only
//! blocking happens inside [`handle::VerificationHandle::resolve`].

pub mod collector;
pub mod ecdsa;
pub mod entities;
pub mod errors;
pub mod expander;
pub mod handle;
pub mod key;
pub mod policy;
