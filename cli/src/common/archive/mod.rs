//! # Decking Archive Utilities (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! Archive helpers. Currently only `tar`, which packs image build contexts
//! for the Docker build API.

/// Gzipped TAR archives of build context directories.
pub mod tar;
