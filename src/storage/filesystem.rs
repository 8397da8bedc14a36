use crate::error::{Error, Result};
use crate::in_toto::Statement;

use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Writes `value` as 2-space indented JSON to `path`, overwriting any existing file.
pub fn persist<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        Error::Serialization(format!("failed to marshal {}: {e}", path.display()))
    })?;

    fs::write(path, json).map_err(|e| Error::file_io("failed to write", path, e))?;
    debug!("wrote {}", path.display());

    Ok(())
}

/// Reads a Statement previously written by [`persist`].
pub fn read_statement(path: &Path) -> Result<Statement> {
    let content =
        fs::read(path).map_err(|e| Error::file_io("error reading provenance file", path, e))?;

    serde_json::from_slice(&content).map_err(|e| {
        Error::Serialization(format!(
            "invalid JSON in provenance file {}: {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_toto::{DigestSet, StatementBuilder, Subject};
    use tempfile::tempdir;

    #[test]
    fn test_persist_and_read_statement() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("provenance.json");
        let stmt = StatementBuilder::new()
            .with_subject(vec![Subject::new(
                "app.bin",
                DigestSet::from([("sha256".to_string(), "abc".to_string())]),
            )])
            .with_metadata("run-1")
            .build();

        persist(&stmt, &path)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with("{\n  \"_type\""));
        assert_eq!(read_statement(&path)?, stmt);
        Ok(())
    }

    #[test]
    fn test_persist_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.json");
        fs::write(&path, "stale content that is longer than the new document")?;

        persist(&vec![1, 2], &path)?;
        assert_eq!(fs::read_to_string(&path)?, "[\n  1,\n  2\n]");
        Ok(())
    }

    #[test]
    fn test_persist_to_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("provenance.json");

        match persist(&StatementBuilder::new().build(), &path) {
            Err(Error::FileIo { context, .. }) => assert!(context.contains("provenance.json")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_statement_invalid_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json")?;

        match read_statement(&path) {
            Err(Error::Serialization(msg)) => assert!(msg.contains("bad.json")),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }
}
