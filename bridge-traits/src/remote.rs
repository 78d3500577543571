//! Remote Row-Store Contracts
//!
//! Typed rows and repository traits for the remote canonical data set. The
//! core consumes these contracts; concrete clients live in provider crates.
//!
//! The remote store owns every `Mix`, `Tag`, `MixTag` and `SavedView`
//! identity. Local caches only ever mirror them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{BridgeError, Result};

/// Closed set of mix content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixType {
    Text,
    Photo,
    Video,
    Import,
    Embed,
    Audio,
}

impl MixType {
    pub const ALL: [MixType; 6] = [
        MixType::Text,
        MixType::Photo,
        MixType::Video,
        MixType::Import,
        MixType::Embed,
        MixType::Audio,
    ];

    /// Get the string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MixType::Text => "text",
            MixType::Photo => "photo",
            MixType::Video => "video",
            MixType::Import => "import",
            MixType::Embed => "embed",
            MixType::Audio => "audio",
        }
    }
}

impl FromStr for MixType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        MixType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BridgeError::OperationFailed(format!("Unknown mix type: {}", s)))
    }
}

impl fmt::Display for MixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Open Graph style metadata captured for embed mixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub site_name: Option<String>,
}

/// Remote canonical mix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mix {
    pub id: String,
    #[serde(rename = "type")]
    pub mix_type: MixType,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub text_content: Option<String>,

    pub photo_url: Option<String>,
    pub photo_thumbnail_url: Option<String>,

    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,

    /// Original social link the import was resolved from
    pub import_url: Option<String>,
    pub import_media_url: Option<String>,
    pub import_thumbnail_url: Option<String>,
    pub import_audio_url: Option<String>,

    pub embed_url: Option<String>,
    pub embed_og: Option<EmbedMetadata>,

    pub audio_url: Option<String>,
    /// Synthesized speech for text mixes
    pub tts_audio_url: Option<String>,

    pub preview_crop_x: Option<f64>,
    pub preview_crop_y: Option<f64>,
    pub preview_crop_scale: Option<f64>,
    pub gradient_top: Option<String>,
    pub gradient_bottom: Option<String>,
}

impl Mix {
    /// A mix of `mix_type` with every optional field empty.
    pub fn new(id: impl Into<String>, mix_type: MixType, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            mix_type,
            created_at,
            title: None,
            text_content: None,
            photo_url: None,
            photo_thumbnail_url: None,
            video_url: None,
            video_thumbnail_url: None,
            import_url: None,
            import_media_url: None,
            import_thumbnail_url: None,
            import_audio_url: None,
            embed_url: None,
            embed_og: None,
            audio_url: None,
            tts_audio_url: None,
            preview_crop_x: None,
            preview_crop_y: None,
            preview_crop_scale: None,
            gradient_top: None,
            gradient_bottom: None,
        }
    }
}

/// Remote tag row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Remote mix/tag association row. No identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MixTag {
    pub mix_id: String,
    pub tag_id: String,
}

impl MixTag {
    pub fn new(mix_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            mix_id: mix_id.into(),
            tag_id: tag_id.into(),
        }
    }
}

/// Saved tag filter (stored remotely in the `playlists` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Remote access to the `mixes` collection.
///
/// `list_mixes` returns the complete set in one call, newest first.
#[async_trait]
pub trait MixRepository: Send + Sync {
    async fn list_mixes(&self) -> Result<Vec<Mix>>;

    /// Returns `Ok(None)` when no mix has this id.
    async fn get_mix(&self, id: &str) -> Result<Option<Mix>>;

    async fn create_mix(&self, mix: &Mix) -> Result<Mix>;

    async fn update_mix(&self, mix: &Mix) -> Result<Mix>;

    async fn delete_mix(&self, id: &str) -> Result<()>;
}

/// Remote access to `tags` and the mix/tag join rows.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn create_tag(&self, name: &str) -> Result<Tag>;

    async fn update_tag(&self, tag: &Tag) -> Result<Tag>;

    async fn delete_tag(&self, id: &str) -> Result<()>;

    /// Every (mix_id, tag_id) row in one bulk read.
    async fn list_mix_tags(&self) -> Result<Vec<MixTag>>;

    async fn add_tag_to_mix(&self, mix_id: &str, tag_id: &str) -> Result<()>;

    async fn remove_tag_from_mix(&self, mix_id: &str, tag_id: &str) -> Result<()>;
}

/// Remote access to saved views.
#[async_trait]
pub trait SavedViewRepository: Send + Sync {
    async fn list_saved_views(&self) -> Result<Vec<SavedView>>;

    async fn create_saved_view(&self, name: &str, tag_ids: &[String]) -> Result<SavedView>;

    async fn update_saved_view(&self, view: &SavedView) -> Result<SavedView>;

    async fn delete_saved_view(&self, id: &str) -> Result<()>;
}

/// Direct media locations resolved from a social-media link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub media_urls: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub audio_url: Option<String>,
    pub title: Option<String>,
}

/// Typed failures of the media URL resolver service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No media found at link")]
    NoMedia,

    #[error("Resolver rate limited")]
    RateLimited,

    #[error("Resolver unreachable: {0}")]
    Network(String),
}

/// External service turning a social link into direct media URLs.
#[async_trait]
pub trait MediaUrlResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> std::result::Result<ResolvedMedia, ResolveError>;
}
