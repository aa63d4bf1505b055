//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: the key verifier API callers use
//! - **Outbound (Driven)**: the crypto engine this subsystem needs

pub mod inbound;
pub mod outbound;
