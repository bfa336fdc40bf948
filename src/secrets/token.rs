//! Secret store token lookup
//!
//! The token is read from `$HOME/<filename>` first, then from `<dir>/<filename>`
//! for each directory in the search path. The first readable file whose trimmed
//! content is non-empty wins.

use crate::config::VaultConfig;
use crate::error::CredentialError;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Default token file name
pub const DEFAULT_TOKEN_FILENAME: &str = ".vault-token";

/// Default fallback directories searched after the home directory
pub const DEFAULT_TOKEN_SEARCH_PATH: &[&str] = &["/var"];

/// Where to look for the secret store token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSearch {
    pub home_dir: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    pub filename: String,
}

impl Default for TokenSearch {
    fn default() -> Self {
        Self {
            home_dir: None,
            search_paths: DEFAULT_TOKEN_SEARCH_PATH.iter().map(PathBuf::from).collect(),
            filename: DEFAULT_TOKEN_FILENAME.to_string(),
        }
    }
}

impl TokenSearch {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            home_dir: config.home_dir.clone(),
            search_paths: config.token_search_paths.clone(),
            filename: config.token_filename.clone(),
        }
    }

    /// Candidate token files in lookup order
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.home_dir
            .iter()
            .chain(self.search_paths.iter())
            .map(|dir| dir.join(&self.filename))
            .collect()
    }

    /// Resolve the token, failing with `NoTokenFound` when no candidate yields one
    pub fn resolve(&self) -> Result<Zeroizing<String>, CredentialError> {
        if self.home_dir.is_none() {
            tracing::debug!("No home directory configured, skipping user token file");
        }

        for path in self.candidates() {
            if let Some(token) = read_token_file(&path) {
                tracing::debug!(path = %path.display(), "Read secret store token");
                return Ok(token);
            }
        }

        Err(CredentialError::NoTokenFound)
    }
}

fn read_token_file(path: &Path) -> Option<Zeroizing<String>> {
    tracing::debug!(path = %path.display(), "Looking for secret store token");

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => Zeroizing::new(contents),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Unable to read token file");
            return None;
        }
    };

    let token = contents.trim();
    if token.is_empty() {
        tracing::debug!(path = %path.display(), "Token file is empty");
        return None;
    }

    Some(Zeroizing::new(token.to_string()))
}
