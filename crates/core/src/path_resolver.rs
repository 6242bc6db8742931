// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Locates the `.lodestar` anchor directory and derives the fixed paths
//! underneath it (spec file, runtime database, lock sentinel).

use crate::error::LodestarError;
use std::path::{Path, PathBuf};

const ANCHOR_DIR_NAME: &str = ".lodestar";
const SPEC_FILE_NAME: &str = "spec.yaml";
const RUNTIME_FILE_NAME: &str = "runtime.db";
const LOCK_FILE_NAME: &str = "spec.lock";

/// Resolved layout of a single Lodestar-managed repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    anchor: PathBuf,
}

impl PathResolver {
    /// Walk upward from `start` looking for a directory literally named
    /// `.lodestar`. Stops at the filesystem root.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, LodestarError> {
        let start = start.as_ref();
        let mut current = Some(start);
        while let Some(dir) = current {
            let candidate = dir.join(ANCHOR_DIR_NAME);
            if candidate.is_dir() {
                return Ok(Self { anchor: candidate });
            }
            current = dir.parent();
        }
        Err(LodestarError::NotInitialized { searched_from: start.to_path_buf() })
    }

    /// Resolve using the `LODESTAR_REPO` override when set, falling back to
    /// an upward walk from `start` otherwise.
    pub fn discover_with_env_override(start: impl AsRef<Path>) -> Result<Self, LodestarError> {
        match std::env::var_os("LODESTAR_REPO") {
            Some(repo) => Self::discover(PathBuf::from(repo)),
            None => Self::discover(start),
        }
    }

    /// Construct a resolver directly from a known anchor directory, without
    /// walking the filesystem. Used by `init` once the directory has been
    /// created.
    pub fn at_anchor(anchor: impl Into<PathBuf>) -> Self {
        Self { anchor: anchor.into() }
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    pub fn spec_path(&self) -> PathBuf {
        self.anchor.join(SPEC_FILE_NAME)
    }

    pub fn runtime_path(&self) -> PathBuf {
        self.anchor.join(RUNTIME_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.anchor.join(LOCK_FILE_NAME)
    }
}

#[cfg(test)]
#[path = "path_resolver_tests.rs"]
mod tests;
