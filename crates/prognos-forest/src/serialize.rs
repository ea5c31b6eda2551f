//! Versioned binary artifacts via bincode.
//!
//! Every artifact starts with a header (`format_version`, `kind`) so a file
//! written by a different build or holding a different model is rejected
//! before its payload is decoded.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Artifact kind tag for a bare forest.
const FOREST_KIND: &str = "random-forest";

#[derive(serde::Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    kind: String,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    kind: &'a str,
    payload: &'a T,
}

/// Write `payload` to `path` inside a versioned envelope tagged with `kind`.
///
/// # Errors
///
/// | Variant                               | Condition               |
/// |---------------------------------------|-------------------------|
/// | [`ForestError::SerializeArtifact`]    | bincode encoding failed |
/// | [`ForestError::WriteArtifact`]        | file write failed       |
#[instrument(skip(payload), fields(path = %path.display()))]
pub fn write_artifact<T: Serialize>(path: &Path, kind: &str, payload: &T) -> Result<(), ForestError> {
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        kind,
        payload,
    };
    let bytes = bincode::serialize(&envelope).map_err(|e| ForestError::SerializeArtifact {
        kind: kind.to_string(),
        source: e,
    })?;
    std::fs::write(path, &bytes).map_err(|e| ForestError::WriteArtifact {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(size_bytes = bytes.len(), kind, "artifact saved");
    Ok(())
}

/// Read an artifact of the given `kind` from `path`.
///
/// # Errors
///
/// | Variant                                     | Condition                      |
/// |---------------------------------------------|--------------------------------|
/// | [`ForestError::ReadArtifact`]               | file read failed               |
/// | [`ForestError::DeserializeArtifact`]        | bincode decoding failed        |
/// | [`ForestError::IncompatibleArtifactVersion`]| format version mismatch        |
/// | [`ForestError::ArtifactKindMismatch`]       | the file holds another kind    |
#[instrument(fields(path = %path.display()))]
pub fn read_artifact<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T, ForestError> {
    let bytes = std::fs::read(path).map_err(|e| ForestError::ReadArtifact {
        path: path.to_path_buf(),
        source: e,
    })?;

    let deserialize_err = |e| ForestError::DeserializeArtifact {
        path: path.to_path_buf(),
        source: e,
    };

    let header: ArtifactHeader = bincode::deserialize(&bytes).map_err(deserialize_err)?;
    if header.format_version != FORMAT_VERSION {
        return Err(ForestError::IncompatibleArtifactVersion {
            expected: FORMAT_VERSION,
            found: header.format_version,
            path: path.to_path_buf(),
        });
    }
    if header.kind != kind {
        return Err(ForestError::ArtifactKindMismatch {
            expected: kind.to_string(),
            found: header.kind,
            path: path.to_path_buf(),
        });
    }

    // bincode lays a struct out as its fields in order, so the envelope
    // decodes as the header followed by the payload.
    let (_, payload): (ArtifactHeader, T) =
        bincode::deserialize(&bytes).map_err(deserialize_err)?;
    debug!(size_bytes = bytes.len(), kind, "artifact loaded");
    Ok(payload)
}

impl RandomForest {
    /// Save the forest to a binary artifact file.
    ///
    /// # Errors
    ///
    /// See [`write_artifact`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        write_artifact(path.as_ref(), FOREST_KIND, self)
    }

    /// Load a forest from a binary artifact file.
    ///
    /// # Errors
    ///
    /// Any error of [`read_artifact`], or [`ForestError::MalformedModel`]
    /// when the decoded forest fails [`RandomForest::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let forest: RandomForest = read_artifact(path.as_ref(), FOREST_KIND)?;
        forest.validate()?;
        debug!(
            n_trees = forest.n_trees(),
            n_features = forest.n_features(),
            "forest loaded"
        );
        Ok(forest)
    }
}
