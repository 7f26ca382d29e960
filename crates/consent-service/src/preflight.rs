//! Runtime-asset existence probe run before a messaging client is built.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::capabilities::AssetProbe;

/// `HEAD` for http(s) locations, filesystem metadata for everything else.
///
/// Root-relative locations (`/x.wasm`) are resolved against `origin` when one
/// is configured, matching how a page would fetch them.
#[derive(Clone)]
pub struct HttpAssetProbe {
    client: reqwest::Client,
    origin: Option<String>,
}

impl HttpAssetProbe {
    pub fn new(origin: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("consent-service-preflight/0.1")
            .build()
            .map_err(|e| anyhow!("probe client: {e}"))?;
        Ok(Self {
            client,
            origin: origin.map(|o| o.trim_end_matches('/').to_string()),
        })
    }

    fn resolve(&self, location: &str) -> Target {
        if location.starts_with("http://") || location.starts_with("https://") {
            return Target::Url(location.to_string());
        }
        if let Some(path) = location.strip_prefix("file://") {
            return Target::File(PathBuf::from(path));
        }
        match (&self.origin, location.starts_with('/')) {
            (Some(origin), true) => Target::Url(format!("{origin}{location}")),
            _ => Target::File(PathBuf::from(location)),
        }
    }
}

enum Target {
    Url(String),
    File(PathBuf),
}

#[async_trait::async_trait]
impl AssetProbe for HttpAssetProbe {
    async fn exists(&self, location: &str) -> Result<bool> {
        match self.resolve(location) {
            Target::Url(url) => {
                let res = self.client.head(&url).send().await?;
                debug!(%url, status = %res.status(), "runtime asset probe");
                Ok(res.status().is_success())
            }
            Target::File(path) => match tokio::fs::metadata(&path).await {
                Ok(meta) => Ok(meta.is_file()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(err) => Err(err.into()),
            },
        }
    }
}
