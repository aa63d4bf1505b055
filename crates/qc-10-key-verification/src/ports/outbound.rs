//! # Outbound Ports (Driven Ports / SPI)
//!
//! The cryptographic engine. This subsystem never performs signature math
//! itself; it shapes requests for the engine and composes its answers.

use crate::domain::errors::ResolveError;
use crate::domain::key::KeyAlgorithm;
use std::time::Duration;

/// Pending boolean answer from the crypto engine.
pub trait CryptoHandle: Send + Sync {
    /// Block for at most `timeout` waiting for the answer.
    ///
    /// # Errors
    /// * `ResolveError::Timeout` - no answer before the deadline
    /// * `ResolveError::Cancelled` - the request was cancelled
    /// * `ResolveError::Engine` - the engine failed to evaluate the request
    fn wait(&self, timeout: Duration) -> Result<bool, ResolveError>;

    /// Best-effort cancellation; `false` if the answer is already final.
    fn cancel(&self) -> bool;

    /// Whether `wait` would return without blocking.
    fn is_done(&self) -> bool;
}

/// Asynchronous signature verification capability.
///
/// Implementations run the work on their own pool; `verify_async` must not block.
pub trait CryptoEngine: Send + Sync {
    /// Submit one verification request.
    ///
    /// # Arguments
    /// * `payload` - Signed bytes (for secp256k1 a 32-byte keccak256 prehash)
    /// * `signature` - Raw signature bytes
    /// * `public_key` - Complete public key (compressed for secp256k1)
    /// * `algorithm` - Signature algorithm
    fn verify_async(
        &self,
        payload: Vec<u8>,
        signature: Vec<u8>,
        public_key: Vec<u8>,
        algorithm: KeyAlgorithm,
    ) -> Box<dyn CryptoHandle>;
}
