//! Unions watched pubkeys from an on-disk list and zero or more remote
//! signers. The `KeySource` trait is a small capability abstraction —
//! `fetch_keys() -> Set<Pubkey>` plus a union combinator — that lets the
//! file reader and the Web3Signer client share a reload path.

use crate::error::Error;
use crate::types::Pubkey;
use async_trait::async_trait;
use reqwest::Client;
use slog::{debug, warn, Logger};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch_keys(&self) -> Result<HashSet<Pubkey>, Error>;
}

/// Reads newline-separated hex keys from a file on disk. Re-reading it
/// (rather than caching its contents) is what lets an operator edit the
/// file without restarting the watcher.
pub struct FileKeySource {
    path: PathBuf,
}

impl FileKeySource {
    pub fn new(path: PathBuf) -> Self {
        FileKeySource { path }
    }
}

#[async_trait]
impl KeySource for FileKeySource {
    async fn fetch_keys(&self) -> Result<HashSet<Pubkey>, Error> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Pubkey::normalize)
            .collect()
    }
}

/// `GET {url}/api/v1/eth2/publicKeys -> ["0x...", ...]`.
pub struct Web3SignerKeySource {
    http: Client,
    base_url: Url,
}

impl Web3SignerKeySource {
    pub fn new(base_url: Url) -> Self {
        Web3SignerKeySource {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl KeySource for Web3SignerKeySource {
    async fn fetch_keys(&self) -> Result<HashSet<Pubkey>, Error> {
        let url = self
            .base_url
            .join("api/v1/eth2/publicKeys")
            .map_err(|e| Error::TransportError(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::TransportError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::TransportError(format!("web3signer returned {}", response.status())));
        }

        let raw_keys: Vec<String> = response.json().await.map_err(|e| Error::TransportError(e.to_string()))?;
        raw_keys.into_iter().map(|k| Pubkey::normalize(&k)).collect()
    }
}

/// Union keys from an on-disk list and from zero or more remote signers.
/// A failing signer is logged and skipped rather than aborting the whole
/// reload — one unreachable signer should not blind the watcher to keys
/// served by the file or by other signers.
pub async fn load_watched_keys(
    file_path: Option<&Path>,
    signer_urls: &HashSet<Url>,
    log: &Logger,
) -> Result<HashSet<Pubkey>, Error> {
    let mut keys = HashSet::new();

    if let Some(path) = file_path {
        let source = FileKeySource::new(path.to_path_buf());
        keys.extend(source.fetch_keys().await?);
    }

    for signer_url in signer_urls {
        let source = Web3SignerKeySource::new(signer_url.clone());
        match source.fetch_keys().await {
            Ok(signer_keys) => {
                debug!(log, "loaded keys from signer"; "url" => signer_url.as_str(), "count" => signer_keys.len());
                keys.extend(signer_keys);
            }
            Err(e) => {
                warn!(log, "failed to load keys from signer, skipping"; "url" => signer_url.as_str(), "error" => e.to_string());
            }
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_source_normalizes_and_dedupes() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("watched_keys_test_{}.txt", std::process::id()));
        let body = format!(
            "0x{}\n{}\n\n  \n",
            "a".repeat(96),
            "A".repeat(96), // same key, different case; collapses by value
        );
        tokio::fs::write(&path, body).await.unwrap();

        let source = FileKeySource::new(path.clone());
        let keys = source.fetch_keys().await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&Pubkey::normalize(&format!("0x{}", "a".repeat(96))).unwrap()));
    }

    #[tokio::test]
    async fn file_source_rejects_malformed_key() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("watched_keys_bad_{}.txt", std::process::id()));
        tokio::fs::write(&path, "not-a-key\n").await.unwrap();

        let source = FileKeySource::new(path.clone());
        let result = source.fetch_keys().await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(matches!(result, Err(Error::InvalidAddress(_))));
    }
}
