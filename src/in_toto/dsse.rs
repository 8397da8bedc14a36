//! Dead Simple Signing Envelope (DSSE) wrapping for Statements.
//!
//! The Statement is serialized to compact JSON and signed over the DSSE v1
//! pre-authentication encoding (PAE) of payload type and payload.

use crate::error::{Error, Result};
use crate::in_toto::{PAYLOAD_TYPE, Statement};
use crate::signing;
use crate::signing::SecurePrivateKey;
use crate::signing::signable::Signable;

use openssl::pkey::{PKey, Public};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keyid: String,
    #[serde_as(as = "serde_with::base64::Base64")]
    pub sig: Vec<u8>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "payloadType")]
    payload_type: String,
    #[serde_as(as = "serde_with::base64::Base64")]
    payload: Vec<u8>,
    signatures: Vec<Signature>,
}

/// DSSE v1 pre-authentication encoding.
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut encoded = format!(
        "DSSEv1 {} {} {} ",
        payload_type.len(),
        payload_type,
        payload.len()
    )
    .into_bytes();
    encoded.extend_from_slice(payload);
    encoded
}

impl Envelope {
    fn new(payload: Vec<u8>, payload_type: &str) -> Self {
        Self {
            payload,
            payload_type: payload_type.to_string(),
            signatures: vec![],
        }
    }

    fn add_signature(&mut self, sig: Vec<u8>, keyid: String) -> Result<()> {
        if sig.is_empty() {
            return Err(Error::Signing("DSSE signature cannot be empty".to_string()));
        }

        self.signatures.push(Signature { keyid, sig });
        Ok(())
    }

    pub fn payload_type(&self) -> &str {
        &self.payload_type
    }

    /// The decoded payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Checks that all required envelope fields are present.
    pub fn validate(&self) -> bool {
        if self.payload.is_empty() || self.payload_type.is_empty() || self.signatures.is_empty() {
            return false;
        }

        self.signatures.iter().all(|s| !s.sig.is_empty())
    }

    /// Decodes the payload back into a Statement.
    pub fn statement(&self) -> Result<Statement> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| Error::Serialization(format!("invalid statement payload: {e}")))
    }

    /// Returns true when every signature verifies against `public_key`.
    pub fn verify(&self, public_key: &PKey<Public>) -> Result<bool> {
        if !self.validate() {
            return Ok(false);
        }

        let message = pae(&self.payload_type, &self.payload);
        for signature in &self.signatures {
            if !signing::verify_signature(&message, &signature.sig, public_key)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl Signable for Statement {
    fn sign(&self, key: &SecurePrivateKey) -> Result<Envelope> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| Error::Serialization(format!("could not marshal statement: {e}")))?;

        let mut envelope = Envelope::new(payload, PAYLOAD_TYPE);
        let signature = signing::sign_data(&pae(PAYLOAD_TYPE, envelope.payload()), key)?;
        envelope.add_signature(signature, String::new())?;

        Ok(envelope)
    }
}
