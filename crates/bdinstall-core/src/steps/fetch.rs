//! Loader package resolution and download.
//!
//! The release feed is a "list releases" endpoint returning a JSON array,
//! newest first. Only the first release is considered; its assets are
//! searched for the package name case-insensitively, and the asset's API `url`
//! is fetched with `Accept: application/octet-stream` so the server redirects
//! to the raw bytes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::FeedSettings;
use crate::error::FetchError;
use crate::fs::{existing_file_hash, hash_bytes, write_atomic_raw};

/// Only the latest release is interpreted; older entries stay raw JSON.
#[derive(Debug, Clone, Deserialize)]
struct FeedRelease {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedAsset {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl FeedRelease {
    /// Assets that parse as objects, skipping malformed entries.
    fn assets(&self) -> impl Iterator<Item = FeedAsset> + '_ {
        self.assets
            .iter()
            .flatten()
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
    }
}

fn names_match(name: &str, wanted: &str) -> bool {
    name.to_lowercase() == wanted.to_lowercase()
}

/// The asset picked from the most recent release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    /// Release tag, e.g. `v1.9.3`.
    pub tag: Option<String>,
    /// The tag as a semantic version, when it is one.
    pub version: Option<semver::Version>,
}

/// A package written to its final location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub path: PathBuf,
    pub asset: ReleaseAsset,
    /// BLAKE3 hex digest of the package bytes.
    pub digest: String,
    pub size: u64,
    /// The file on disk already had these exact bytes.
    pub unchanged: bool,
}

/// Parse a release tag like `v1.9.3` into a version.
pub fn parse_tag_version(tag: &str) -> Option<semver::Version> {
    semver::Version::parse(tag.trim().trim_start_matches('v')).ok()
}

/// Pick `asset_name` out of the first release in a feed body.
pub fn select_asset(
    feed_url: &str,
    body: &str,
    asset_name: &str,
) -> Result<ReleaseAsset, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::NoBody {
            url: feed_url.to_string(),
            reason: "empty body".to_string(),
        });
    }

    let releases: Option<Vec<serde_json::Value>> =
        serde_json::from_str(body).map_err(|e| FetchError::NoBody {
            url: feed_url.to_string(),
            reason: e.to_string(),
        })?;
    let releases = releases.ok_or_else(|| FetchError::NoBody {
        url: feed_url.to_string(),
        reason: "body is null".to_string(),
    })?;

    // A latest release that is not an object has no assets to offer.
    let release: Option<FeedRelease> = releases
        .into_iter()
        .next()
        .and_then(|value| serde_json::from_value(value).ok());

    let (name, url) = release
        .as_ref()
        .and_then(|r| {
            r.assets().find_map(|asset| match asset.name {
                Some(name) if names_match(&name, asset_name) => Some((name, asset.url)),
                _ => None,
            })
        })
        .ok_or_else(|| FetchError::NoMatchingAsset {
            url: feed_url.to_string(),
            asset: asset_name.to_string(),
        })?;

    let download_url = url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| FetchError::NoDownloadUrl {
            asset: name.clone(),
        })?;

    let tag = release.and_then(|r| r.tag_name);
    let version = tag.as_deref().and_then(parse_tag_version);

    Ok(ReleaseAsset {
        name,
        download_url,
        tag,
        version,
    })
}

/// Resolves and downloads the loader package from the release feed.
#[derive(Debug, Clone)]
pub struct PackageFetcher {
    client: reqwest::Client,
    settings: FeedSettings,
}

impl PackageFetcher {
    pub fn new(settings: FeedSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, settings })
    }

    /// Find the package asset in the most recent release.
    pub async fn resolve_latest(&self) -> Result<ReleaseAsset, FetchError> {
        let url = &self.settings.url;
        debug!(url = %url, "Querying release feed");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::NoResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::NoResponse {
                url: url.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::NoBody {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let asset = select_asset(url, &body, &self.settings.asset_name)?;
        info!(
            asset = %asset.name,
            tag = asset.tag.as_deref().unwrap_or("unknown"),
            "Resolved latest release"
        );
        Ok(asset)
    }

    /// Download `asset` and store it atomically at `dest`.
    pub async fn download(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
    ) -> Result<InstalledPackage, FetchError> {
        let url = &asset.download_url;
        let download_err = |reason: String| FetchError::Download {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let digest = hash_bytes(&bytes);
        let unchanged = existing_file_hash(dest).as_deref() == Some(digest.as_str());
        if unchanged {
            info!(path = %dest.display(), digest = %digest, "Package already up to date");
        } else {
            write_atomic_raw(dest, &bytes).map_err(|source| {
                warn!(url = %url, path = %dest.display(), error = %source, "Failed to write package");
                FetchError::Write {
                    url: url.clone(),
                    path: dest.to_path_buf(),
                    source,
                }
            })?;
            info!(path = %dest.display(), digest = %digest, size = bytes.len(), "Package written");
        }

        Ok(InstalledPackage {
            path: dest.to_path_buf(),
            asset: asset.clone(),
            digest,
            size: bytes.len() as u64,
            unchanged,
        })
    }

    /// Resolve the latest release and download its package to `dest`.
    pub async fn fetch(&self, dest: &Path) -> Result<InstalledPackage, FetchError> {
        let asset = self.resolve_latest().await?;
        self.download(&asset, dest).await
    }
}
