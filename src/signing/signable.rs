//! # Signable Trait
//!
//! A common interface for producing a signed envelope from a value. The
//! in-toto [`Statement`](crate::in_toto::Statement) implements it in
//! [`crate::in_toto::dsse`].
//!
//! ## Examples
//!
//! ```no_run
//! use slsa_provenance::in_toto::StatementBuilder;
//! use slsa_provenance::signing::load_private_key;
//! use slsa_provenance::signing::signable::Signable;
//!
//! let key = load_private_key(None, Some("signing.key".as_ref())).unwrap();
//! let envelope = StatementBuilder::new().build().sign(&key).unwrap();
//! assert!(envelope.validate());
//! ```

use crate::error::Result;
use crate::in_toto::dsse::Envelope;
use crate::signing::SecurePrivateKey;

/// A trait for types that can be cryptographically signed.
///
/// Implementations serialize themselves into the payload bytes, sign them
/// with the provided key and return the resulting envelope. The value itself
/// is left untouched.
pub trait Signable {
    fn sign(&self, key: &SecurePrivateKey) -> Result<Envelope>;
}
