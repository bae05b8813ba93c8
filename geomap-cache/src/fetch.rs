//! Raw byte fetching from disk or the network.

use geomap_core::{GeomapError, Result};
use std::path::Path;

/// True for identifiers that must be downloaded rather than read from disk.
pub fn is_remote(identifier: &str) -> bool {
    identifier.starts_with("https://") || identifier.starts_with("http://")
}

/// Read a local file.
pub fn read_local(path: &str) -> Result<Vec<u8>> {
    if !Path::new(path).exists() {
        return Err(GeomapError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        });
    }
    std::fs::read(path).map_err(|source| GeomapError::Io {
        path: path.to_string(),
        source,
    })
}

/// Download a remote file.
#[cfg(feature = "api")]
pub async fn download(url: &str) -> Result<Vec<u8>> {
    let fail = |reason: String| GeomapError::Fetch {
        url: url.to_string(),
        reason,
    };
    let response = reqwest::get(url).await.map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("bad response status {}", response.status())));
    }
    let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Download a remote file.
#[cfg(not(feature = "api"))]
pub async fn download(url: &str) -> Result<Vec<u8>> {
    Err(GeomapError::Fetch {
        url: url.to_string(),
        reason: "remote fetching is not enabled in this build".to_string(),
    })
}

/// Fetch raw bytes for a resolved identifier.
pub async fn fetch(identifier: &str) -> Result<Vec<u8>> {
    if is_remote(identifier) {
        log::info!("[Geomap] fetch: Downloading {}", identifier);
        download(identifier).await
    } else {
        read_local(identifier)
    }
}
