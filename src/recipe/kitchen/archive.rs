// src/recipe/kitchen/archive.rs

//! Fetching and unpacking sources for the Kitchen
//!
//! The kitchen only talks to the [`Fetcher`] and [`Extractor`] traits; a host
//! package manager can plug in its own transport and cache. [`HttpFetcher`]
//! and [`TarExtractor`] are the defaults.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use xz2::read::XzDecoder;

/// Retrieves the raw bytes behind a URL
pub trait Fetcher: Send + Sync {
    /// Fetch the content at `url`
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Unpacks a source archive into a directory
pub trait Extractor: Send + Sync {
    /// Extract `archive` (named `name`, for format hints and errors) into `dest`
    fn extract(&self, archive: &[u8], name: &str, dest: &Path) -> Result<()>;
}

/// Fetcher for `http(s)://` URLs, `file://` URLs and plain local paths
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("conary-kitchen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::FetchError {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_err = |e: reqwest::Error| Error::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let bytes = response.bytes().map_err(fetch_err)?;

        Ok(bytes.to_vec())
    }

    fn fetch_local(url: &str, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url)
        } else if let Some(path) = url.strip_prefix("file://") {
            Self::fetch_local(url, Path::new(path))
        } else {
            Self::fetch_local(url, Path::new(url))
        }
    }
}

/// Archive formats the [`TarExtractor`] understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed tar
    Tar,
    /// Gzip-compressed tar (.tar.gz, .tgz)
    TarGz,
    /// XZ-compressed tar (.tar.xz, .txz)
    TarXz,
}

impl ArchiveFormat {
    /// Detect the format from magic bytes
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00`
    /// - Tar: `ustar` at offset 257
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Some(Self::TarXz)
        } else if data.len() >= 262 && &data[257..262] == b"ustar" {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Default extractor for tar archives, optionally gzip or xz compressed
#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn extract(&self, archive: &[u8], name: &str, dest: &Path) -> Result<()> {
        let format = ArchiveFormat::detect(archive).ok_or_else(|| Error::ExtractError {
            archive: name.to_string(),
            reason: "unrecognized archive format".to_string(),
        })?;
        debug!("Extracting {} ({:?}) into {}", name, format, dest.display());

        let reader: Box<dyn Read + '_> = match format {
            ArchiveFormat::Tar => Box::new(Cursor::new(archive)),
            ArchiveFormat::TarGz => Box::new(GzDecoder::new(Cursor::new(archive))),
            ArchiveFormat::TarXz => Box::new(XzDecoder::new(Cursor::new(archive))),
        };

        tar::Archive::new(reader)
            .unpack(dest)
            .map_err(|e| Error::ExtractError {
                archive: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Find the source root after extraction
///
/// Most archives wrap everything in a single top-level directory; if so,
/// that directory is the source root. Otherwise the extraction directory is.
pub fn find_source_root(extracted: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(extracted)
        .map_err(|e| Error::io(extracted, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(extracted, e))?;

    if let [entry] = entries.as_slice() {
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_dir() {
            return Ok(entry.path());
        }
    }

    Ok(extracted.to_path_buf())
}
