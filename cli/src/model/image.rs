//! # Decking Images
//!
//! File: cli/src/model/image.rs
//!
//! An `Image` is a named build context. Its only relationship is the base
//! image named by the first `FROM` directive of its `Dockerfile`; that file is
//! read lazily the first time the dependency is asked for (only the build
//! path needs it) and cached afterwards.
//!
use crate::core::error::Result;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug)]
pub struct Image {
    pub name: String,
    /// Absolute path of the build context directory.
    pub path: PathBuf,
    base: OnceLock<Option<String>>,
}

impl Image {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            base: OnceLock::new(),
        }
    }

    /// The `Dockerfile` inside the build context.
    pub fn dockerfile(&self) -> PathBuf {
        self.path.join("Dockerfile")
    }

    /// The base image this image is built `FROM`, parsed on first access.
    pub fn base_image(&self) -> Result<Option<&str>> {
        if let Some(base) = self.base.get() {
            return Ok(base.as_deref());
        }
        let parsed = parse_dockerfile(&self.dockerfile())?;
        debug!("Image '{}' is based on {:?}", self.name, parsed);
        Ok(self.base.get_or_init(|| parsed).as_deref())
    }
}

/// Returns the image named by the first `FROM` line of the file at `path`.
///
/// The keyword is matched case-insensitively; a trailing `AS stage` is not
/// part of the reference.
pub fn parse_dockerfile(path: &Path) -> Result<Option<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read Dockerfile: {}", path.display()))?;
    Ok(parse_base_image(&content))
}

fn parse_base_image(content: &str) -> Option<String> {
    content.lines().map(str::trim_start).find_map(|line| {
        let (keyword, rest) = line.split_once(char::is_whitespace)?;
        if keyword.eq_ignore_ascii_case("FROM") {
            rest.split_whitespace().next().map(String::from)
        } else {
            None
        }
    })
}
