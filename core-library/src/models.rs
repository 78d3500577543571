//! Local store models
//!
//! Cached mirrors of the remote entities plus the on-disk location of every
//! media field that has been materialized. Timestamps are stored as Unix
//! milliseconds.

use bridge_traits::remote::{EmbedMetadata, Mix, MixTag, MixType, SavedView, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;

// =============================================================================
// Media fields
// =============================================================================

/// One downloadable media URL slot on a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaField {
    /// Synthesized speech for text mixes
    SpeechAudio,
    Photo,
    PhotoThumbnail,
    Video,
    VideoThumbnail,
    ImportMedia,
    ImportThumbnail,
    ImportAudio,
    /// Open Graph image of an embed
    EmbedImage,
    Audio,
}

impl MediaField {
    pub const ALL: [MediaField; 10] = [
        MediaField::SpeechAudio,
        MediaField::Photo,
        MediaField::PhotoThumbnail,
        MediaField::Video,
        MediaField::VideoThumbnail,
        MediaField::ImportMedia,
        MediaField::ImportThumbnail,
        MediaField::ImportAudio,
        MediaField::EmbedImage,
        MediaField::Audio,
    ];

    /// Media fields applicable to a mix type, in download order.
    pub fn for_type(mix_type: MixType) -> &'static [MediaField] {
        match mix_type {
            MixType::Text => &[MediaField::SpeechAudio],
            MixType::Photo => &[MediaField::Photo, MediaField::PhotoThumbnail],
            MixType::Video => &[MediaField::Video, MediaField::VideoThumbnail],
            MixType::Import => &[
                MediaField::ImportMedia,
                MediaField::ImportThumbnail,
                MediaField::ImportAudio,
            ],
            MixType::Embed => &[MediaField::EmbedImage],
            MixType::Audio => &[MediaField::Audio],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaField::SpeechAudio => "tts_audio",
            MediaField::Photo => "photo",
            MediaField::PhotoThumbnail => "photo_thumbnail",
            MediaField::Video => "video",
            MediaField::VideoThumbnail => "video_thumbnail",
            MediaField::ImportMedia => "import_media",
            MediaField::ImportThumbnail => "import_thumbnail",
            MediaField::ImportAudio => "import_audio",
            MediaField::EmbedImage => "embed_image",
            MediaField::Audio => "audio",
        }
    }

    /// The remote URL this field mirrors. Empty strings read as absent.
    pub fn remote_url<'a>(&self, mix: &'a Mix) -> Option<&'a str> {
        let url = match self {
            MediaField::SpeechAudio => mix.tts_audio_url.as_deref(),
            MediaField::Photo => mix.photo_url.as_deref(),
            MediaField::PhotoThumbnail => mix.photo_thumbnail_url.as_deref(),
            MediaField::Video => mix.video_url.as_deref(),
            MediaField::VideoThumbnail => mix.video_thumbnail_url.as_deref(),
            MediaField::ImportMedia => mix.import_media_url.as_deref(),
            MediaField::ImportThumbnail => mix.import_thumbnail_url.as_deref(),
            MediaField::ImportAudio => mix.import_audio_url.as_deref(),
            MediaField::EmbedImage => mix
                .embed_og
                .as_ref()
                .and_then(|og| og.image_url.as_deref()),
            MediaField::Audio => mix.audio_url.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

impl fmt::Display for MediaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// LocalMix
// =============================================================================

/// Local relative paths of materialized media, one slot per [`MediaField`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPaths {
    pub tts_audio: Option<String>,
    pub photo: Option<String>,
    pub photo_thumbnail: Option<String>,
    pub video: Option<String>,
    pub video_thumbnail: Option<String>,
    pub import_media: Option<String>,
    pub import_thumbnail: Option<String>,
    pub import_audio: Option<String>,
    pub embed_image: Option<String>,
    pub audio: Option<String>,
}

impl MediaPaths {
    pub fn get(&self, field: MediaField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: MediaField, path: Option<String>) {
        *self.slot_mut(field) = path;
    }

    /// Every recorded path, regardless of mix type.
    pub fn all(&self) -> Vec<&str> {
        MediaField::ALL
            .iter()
            .filter_map(|field| self.get(*field))
            .collect()
    }

    fn slot(&self, field: MediaField) -> &Option<String> {
        match field {
            MediaField::SpeechAudio => &self.tts_audio,
            MediaField::Photo => &self.photo,
            MediaField::PhotoThumbnail => &self.photo_thumbnail,
            MediaField::Video => &self.video,
            MediaField::VideoThumbnail => &self.video_thumbnail,
            MediaField::ImportMedia => &self.import_media,
            MediaField::ImportThumbnail => &self.import_thumbnail,
            MediaField::ImportAudio => &self.import_audio,
            MediaField::EmbedImage => &self.embed_image,
            MediaField::Audio => &self.audio,
        }
    }

    fn slot_mut(&mut self, field: MediaField) -> &mut Option<String> {
        match field {
            MediaField::SpeechAudio => &mut self.tts_audio,
            MediaField::Photo => &mut self.photo,
            MediaField::PhotoThumbnail => &mut self.photo_thumbnail,
            MediaField::Video => &mut self.video,
            MediaField::VideoThumbnail => &mut self.video_thumbnail,
            MediaField::ImportMedia => &mut self.import_media,
            MediaField::ImportThumbnail => &mut self.import_thumbnail,
            MediaField::ImportAudio => &mut self.import_audio,
            MediaField::EmbedImage => &mut self.embed_image,
            MediaField::Audio => &mut self.audio,
        }
    }
}

/// Cached mirror of a remote [`Mix`].
///
/// `remote` carries the scalar fields exactly as last fetched; `paths` holds
/// where each media field was materialized. `is_synced` is true only when
/// every applicable non-empty remote URL has an existing local file.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMix {
    pub remote: Mix,
    pub paths: MediaPaths,
    pub is_synced: bool,
    /// Unix millis of the last pass that touched this record
    pub last_synced_at: Option<i64>,
}

impl LocalMix {
    /// New unsynced mirror with no local media.
    pub fn from_remote(mix: &Mix) -> Self {
        Self {
            remote: mix.clone(),
            paths: MediaPaths::default(),
            is_synced: false,
            last_synced_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.remote.id
    }

    pub fn mix_type(&self) -> MixType {
        self.remote.mix_type
    }

    /// Replace scalar fields with the latest remote values, keeping local paths.
    pub fn apply_remote(&mut self, mix: &Mix) {
        self.remote = mix.clone();
    }

    pub fn local_path(&self, field: MediaField) -> Option<&str> {
        self.paths.get(field)
    }

    pub fn set_local_path(&mut self, field: MediaField, path: Option<String>) {
        self.paths.set(field, path);
    }

    pub fn remote_url(&self, field: MediaField) -> Option<&str> {
        field.remote_url(&self.remote)
    }

    /// Media fields of this mix's type.
    pub fn media_fields(&self) -> &'static [MediaField] {
        MediaField::for_type(self.remote.mix_type)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.remote.id.trim().is_empty() {
            return Err("Mix id cannot be empty".to_string());
        }
        Ok(())
    }
}

impl<'r> FromRow<'r, SqliteRow> for LocalMix {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let mix_type: String = row.try_get("type")?;
        let mix_type = mix_type
            .parse::<MixType>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "type".to_string(),
                source: Box::new(e),
            })?;

        let embed_og: Option<String> = row.try_get("embed_og")?;
        let embed_og = embed_og
            .map(|json| serde_json::from_str::<EmbedMetadata>(&json))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "embed_og".to_string(),
                source: Box::new(e),
            })?;

        let created_at = millis_to_datetime(row.try_get("created_at")?);

        let remote = Mix {
            id: row.try_get("id")?,
            mix_type,
            created_at,
            title: row.try_get("title")?,
            text_content: row.try_get("text_content")?,
            photo_url: row.try_get("photo_url")?,
            photo_thumbnail_url: row.try_get("photo_thumbnail_url")?,
            video_url: row.try_get("video_url")?,
            video_thumbnail_url: row.try_get("video_thumbnail_url")?,
            import_url: row.try_get("import_url")?,
            import_media_url: row.try_get("import_media_url")?,
            import_thumbnail_url: row.try_get("import_thumbnail_url")?,
            import_audio_url: row.try_get("import_audio_url")?,
            embed_url: row.try_get("embed_url")?,
            embed_og,
            audio_url: row.try_get("audio_url")?,
            tts_audio_url: row.try_get("tts_audio_url")?,
            preview_crop_x: row.try_get("preview_crop_x")?,
            preview_crop_y: row.try_get("preview_crop_y")?,
            preview_crop_scale: row.try_get("preview_crop_scale")?,
            gradient_top: row.try_get("gradient_top")?,
            gradient_bottom: row.try_get("gradient_bottom")?,
        };

        let paths = MediaPaths {
            tts_audio: row.try_get("tts_audio_path")?,
            photo: row.try_get("photo_path")?,
            photo_thumbnail: row.try_get("photo_thumbnail_path")?,
            video: row.try_get("video_path")?,
            video_thumbnail: row.try_get("video_thumbnail_path")?,
            import_media: row.try_get("import_media_path")?,
            import_thumbnail: row.try_get("import_thumbnail_path")?,
            import_audio: row.try_get("import_audio_path")?,
            embed_image: row.try_get("embed_image_path")?,
            audio: row.try_get("audio_path")?,
        };

        Ok(Self {
            remote,
            paths,
            is_synced: row.try_get("is_synced")?,
            last_synced_at: row.try_get("last_synced_at")?,
        })
    }
}

// =============================================================================
// Tags
// =============================================================================

/// Cached mirror of a remote [`Tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalTag {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl LocalTag {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Tag id cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Tag name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl From<&Tag> for LocalTag {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            created_at: tag.created_at.timestamp_millis(),
        }
    }
}

/// Local mix/tag association row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRow)]
pub struct LocalMixTag {
    pub mix_id: String,
    pub tag_id: String,
}

impl From<&MixTag> for LocalMixTag {
    fn from(row: &MixTag) -> Self {
        Self {
            mix_id: row.mix_id.clone(),
            tag_id: row.tag_id.clone(),
        }
    }
}

// =============================================================================
// Saved views
// =============================================================================

/// Cached mirror of a remote [`SavedView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSavedView {
    pub id: String,
    pub name: String,
    pub tag_ids: Vec<String>,
    pub created_at: i64,
}

impl From<&SavedView> for LocalSavedView {
    fn from(view: &SavedView) -> Self {
        Self {
            id: view.id.clone(),
            name: view.name.clone(),
            tag_ids: view.tag_ids.clone(),
            created_at: view.created_at.timestamp_millis(),
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for LocalSavedView {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let tag_ids: String = row.try_get("tag_ids")?;
        let tag_ids =
            serde_json::from_str::<Vec<String>>(&tag_ids).map_err(|e| sqlx::Error::ColumnDecode {
                index: "tag_ids".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            tag_ids,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Convert stored Unix millis back to a UTC timestamp.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}
