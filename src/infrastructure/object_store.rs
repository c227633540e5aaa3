//! Environment-scoped blob storage.
//!
//! Artifacts (datasets, model dumps) are addressed by a relative path plus a
//! deployment environment, keeping dev and prod artifacts apart under one
//! root.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Dev,
    Prod,
}

impl Env {
    fn as_str(&self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Prod => "prod",
        }
    }
}

impl FromStr for Env {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Env::Dev),
            "prod" => Ok(Env::Prod),
            other => Err(ConfigError::InvalidEnv(other.to_string())),
        }
    }
}

#[async_trait]
pub trait ObjectStore {
    async fn upload(&self, data: &[u8], path: &str, env: Env) -> Result<()>;
    async fn download(&self, path: &str, env: Env) -> Result<Vec<u8>>;
}

/// Filesystem-backed store rooted at a single directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str, env: Env) -> PathBuf {
        self.root.join(env.as_str()).join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, data: &[u8], path: &str, env: Env) -> Result<()> {
        let target = self.resolve(path, env);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&target, data)
            .await
            .with_context(|| format!("writing {}", target.display()))?;
        debug!(path = %target.display(), bytes = data.len(), "uploaded object");
        Ok(())
    }

    async fn download(&self, path: &str, env: Env) -> Result<Vec<u8>> {
        let target = self.resolve(path, env);
        tokio::fs::read(&target)
            .await
            .with_context(|| format!("reading {}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_from_str() {
        assert_eq!("dev".parse::<Env>().unwrap(), Env::Dev);
        assert_eq!("PROD".parse::<Env>().unwrap(), Env::Prod);
        assert!(matches!(
            "staging".parse::<Env>(),
            Err(ConfigError::InvalidEnv(s)) if s == "staging"
        ));
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let root = std::env::temp_dir().join(format!("tidecast-store-{}", std::process::id()));
        let store = LocalObjectStore::new(&root);
        store
            .upload(b"candles", "btc/2023.csv", Env::Dev)
            .await
            .unwrap();
        let data = store.download("btc/2023.csv", Env::Dev).await.unwrap();
        assert_eq!(data, b"candles");
        // Environments do not share a namespace.
        assert!(store.download("btc/2023.csv", Env::Prod).await.is_err());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
