//! # Hash Module
//!
//! SHA-256 content hashing for provenance subjects. Digests are returned as
//! lowercase hex strings, the form in-toto `DigestSet` values use.
//!
//! ## Examples
//!
//! ```
//! use slsa_provenance::hash::calculate_hash;
//!
//! let hash = calculate_hash(b"hello world");
//! assert_eq!(
//!     hash,
//!     "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
//! );
//! ```

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The digest algorithm name recorded alongside every hash this module produces.
pub const SHA256: &str = "sha256";

/// Calculate the SHA-256 hash of the given data
pub fn calculate_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Calculate the SHA-256 hash of a file.
///
/// The file is streamed in chunks, so artifacts of any size can be hashed
/// without loading them into memory.
///
/// # Errors
///
/// Returns `Error::FileIo` naming the path if the file cannot be opened or read.
pub fn calculate_file_hash(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::file_io("failed to open", path, e))?;

    hash_reader::<Sha256, _>(file).map_err(|e| match e {
        Error::Io(io) => Error::file_io("failed to read", path, io),
        other => other,
    })
}

fn hash_reader<D: Digest, R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
