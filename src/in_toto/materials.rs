//! Loading extra materials from JSON files.
//!
//! Each file holds a JSON array of `{"uri": ..., "digest": {...}}` objects.
//! Every entry needs a non-empty `uri` and at least one digest.

use crate::error::{Error, Result};
use crate::in_toto::Item;

use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Reads and validates materials from `reader`. `source` names the origin in errors.
pub fn read_materials<R: Read>(reader: R, source: &str) -> Result<Vec<Item>> {
    let materials: Vec<Item> = serde_json::from_reader(reader).map_err(|e| {
        Error::Serialization(format!(
            "failed retrieving extra materials for {source}: {e}"
        ))
    })?;

    for material in &materials {
        if material.uri.is_empty() {
            return Err(Error::Validation(format!(
                "missing uri for material in {source}"
            )));
        }
        if material.digest.is_empty() {
            return Err(Error::Validation(format!(
                "missing digest for material in {source}"
            )));
        }
    }

    Ok(materials)
}

/// Loads materials from every file in `sources`, in order, failing on the first bad file.
pub fn load_materials(sources: &[PathBuf]) -> Result<Vec<Item>> {
    let mut materials = Vec::new();

    for source in sources {
        materials.extend(load_material_file(source)?);
    }

    Ok(materials)
}

fn load_material_file(path: &Path) -> Result<Vec<Item>> {
    let file = File::open(path)
        .map_err(|e| Error::file_io("failed retrieving extra materials from", path, e))?;

    let items = read_materials(BufReader::new(file), &path.display().to_string())?;
    debug!("loaded {} material(s) from {}", items.len(), path.display());

    Ok(items)
}
