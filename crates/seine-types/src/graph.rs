use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::StatusParseError;

/// A raw link found on a page, after absolutization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: String,
    pub text: String,
    pub rel: Option<String>,
}

/// One outbound edge of the link graph. The full outbound set of a page is
/// recorded regardless of whether the child will ever be fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub parent_url: String,
    pub child_url: String,
    pub anchor_text: String,
    pub is_external: bool,
    pub canonical_child_url: String,
}

/// Kind of a downloadable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Pdf,
    Video,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Pdf => "pdf",
            AssetKind::Video => "video",
            AssetKind::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(AssetKind::Pdf),
            "video" => Ok(AssetKind::Video),
            "audio" => Ok(AssetKind::Audio),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// One row in the `assets` table, deduplicated by asset URL.
///
/// `source_page_url` is the page that discovered the asset; it is `None`
/// when the asset URL was itself a seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    pub asset_url: String,
    pub source_page_url: Option<String>,
    pub asset_type: AssetKind,
    pub local_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_round_trip() {
        for kind in [AssetKind::Pdf, AssetKind::Video, AssetKind::Audio] {
            assert_eq!(kind.as_str().parse::<AssetKind>().unwrap(), kind);
        }
        assert!("image".parse::<AssetKind>().is_err());
    }
}
