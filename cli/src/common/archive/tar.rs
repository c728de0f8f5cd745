//! # Decking Build Context Archives (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! The Docker build API takes the build context as a (gzipped) TAR archive in
//! the request body. `create_context_tar` packs an image's context directory
//! in memory, with paths relative to the directory root so that the
//! `Dockerfile` sits at the top of the archive.
//!
//! The archive is built with the `tar` crate and compressed with `flate2`.
//!
use crate::core::error::{DeckingError, Result};
use anyhow::{anyhow, Context};
use std::path::Path;

/// # Create Gzipped TAR Build Context (`create_context_tar`)
///
/// Packs the contents of `context_path` recursively into an in-memory
/// `.tar.gz`.
///
/// ## Errors
///
/// - `DeckingError::Engine` when `context_path` has no `Dockerfile`.
/// - An I/O error when a file cannot be read or the archive cannot be finished.
pub fn create_context_tar(context_path: &Path) -> Result<Vec<u8>> {
    if !context_path.join("Dockerfile").is_file() {
        return Err(anyhow!(DeckingError::Engine(format!(
            "No Dockerfile found in build context '{}'",
            context_path.display()
        ))));
    }

    let mut tar_gz_bytes = Vec::new();
    let enc = flate2::write::GzEncoder::new(&mut tar_gz_bytes, flate2::Compression::default());
    let mut tar_builder = tar::Builder::new(enc);

    tar_builder
        .append_dir_all(".", context_path)
        .with_context(|| {
            format!(
                "Failed to add directory '{}' contents to the tar archive",
                context_path.display()
            )
        })?;

    let encoder = tar_builder
        .into_inner()
        .context("Failed to finalize tar archive structure")?;
    encoder
        .finish()
        .context("Failed to finish gzip compression stream")?;

    Ok(tar_gz_bytes)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::collections::HashSet;
    use std::fs;
    use tar::Archive;
    use tempfile::tempdir;

    #[test]
    fn test_context_contains_dockerfile_and_sources() -> Result<()> {
        let temp_dir = tempdir()?;
        let dir_path = temp_dir.path();
        fs::write(dir_path.join("Dockerfile"), "FROM ubuntu\nCOPY app /app\n")?;
        fs::create_dir(dir_path.join("app"))?;
        fs::write(dir_path.join("app/run.sh"), "#!/bin/sh\n")?;

        let tar_data = create_context_tar(dir_path)?;
        let mut archive = Archive::new(GzDecoder::new(tar_data.as_slice()));
        let mut found = HashSet::new();
        for entry in archive.entries()? {
            let entry = entry?;
            found.insert(entry.path()?.to_string_lossy().replace('\\', "/"));
        }
        assert!(found.contains("Dockerfile"));
        assert!(found.contains("app/run.sh"));
        Ok(())
    }

    #[test]
    fn test_context_without_dockerfile_is_rejected() -> Result<()> {
        let temp_dir = tempdir()?;
        let err = create_context_tar(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("No Dockerfile found"));
        Ok(())
    }
}
