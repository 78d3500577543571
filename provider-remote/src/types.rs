//! Remote REST request payloads
//!
//! Row reads deserialize straight into the `bridge_traits::remote` types.
//! Writes send these narrower payloads so server-owned columns (`id`,
//! `created_at`) are left to the backend.

use bridge_traits::remote::{EmbedMetadata, Mix, MixType};
use serde::Serialize;

/// Remote collection holding mixes
pub const MIXES: &str = "mixes";

/// Remote collection holding tags
pub const TAGS: &str = "tags";

/// Remote join collection of mix/tag pairs
pub const MIX_TAGS: &str = "mix_tags";

/// Remote collection holding saved views
pub const SAVED_VIEWS: &str = "playlists";

/// Insert payload for a tag
#[derive(Debug, Serialize)]
pub struct NewTag<'a> {
    pub name: &'a str,
}

/// Insert payload for a mix/tag pair
#[derive(Debug, Serialize)]
pub struct NewMixTag<'a> {
    pub mix_id: &'a str,
    pub tag_id: &'a str,
}

/// Insert or patch payload for a saved view
#[derive(Debug, Serialize)]
pub struct SavedViewPayload<'a> {
    pub name: &'a str,
    pub tag_ids: &'a [String],
}

/// Writable columns of a mix.
///
/// Creates send the client-generated id; patches omit it.
#[derive(Debug, Serialize)]
pub struct MixPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(rename = "type")]
    pub mix_type: MixType,
    pub title: Option<&'a str>,
    pub text_content: Option<&'a str>,
    pub photo_url: Option<&'a str>,
    pub photo_thumbnail_url: Option<&'a str>,
    pub video_url: Option<&'a str>,
    pub video_thumbnail_url: Option<&'a str>,
    pub import_url: Option<&'a str>,
    pub import_media_url: Option<&'a str>,
    pub import_thumbnail_url: Option<&'a str>,
    pub import_audio_url: Option<&'a str>,
    pub embed_url: Option<&'a str>,
    pub embed_og: Option<&'a EmbedMetadata>,
    pub audio_url: Option<&'a str>,
    pub tts_audio_url: Option<&'a str>,
    pub preview_crop_x: Option<f64>,
    pub preview_crop_y: Option<f64>,
    pub preview_crop_scale: Option<f64>,
    pub gradient_top: Option<&'a str>,
    pub gradient_bottom: Option<&'a str>,
}

impl<'a> MixPayload<'a> {
    /// Payload for creating `mix`, keeping its id
    pub fn create(mix: &'a Mix) -> Self {
        Self {
            id: Some(mix.id.as_str()),
            ..Self::patch(mix)
        }
    }

    /// Payload for updating `mix` in place
    pub fn patch(mix: &'a Mix) -> Self {
        Self {
            id: None,
            mix_type: mix.mix_type,
            title: mix.title.as_deref(),
            text_content: mix.text_content.as_deref(),
            photo_url: mix.photo_url.as_deref(),
            photo_thumbnail_url: mix.photo_thumbnail_url.as_deref(),
            video_url: mix.video_url.as_deref(),
            video_thumbnail_url: mix.video_thumbnail_url.as_deref(),
            import_url: mix.import_url.as_deref(),
            import_media_url: mix.import_media_url.as_deref(),
            import_thumbnail_url: mix.import_thumbnail_url.as_deref(),
            import_audio_url: mix.import_audio_url.as_deref(),
            embed_url: mix.embed_url.as_deref(),
            embed_og: mix.embed_og.as_ref(),
            audio_url: mix.audio_url.as_deref(),
            tts_audio_url: mix.tts_audio_url.as_deref(),
            preview_crop_x: mix.preview_crop_x,
            preview_crop_y: mix.preview_crop_y,
            preview_crop_scale: mix.preview_crop_scale,
            gradient_top: mix.gradient_top.as_deref(),
            gradient_bottom: mix.gradient_bottom.as_deref(),
        }
    }
}

/// Equality filter value for a query string: `eq.<value>`, percent-encoded.
pub fn eq_filter(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_patch_payload_omits_id_and_created_at() {
        let mut mix = Mix::new("m1", MixType::Photo, Utc.timestamp_millis_opt(0).unwrap());
        mix.photo_url = Some("photos/a.jpg".to_string());

        let json = serde_json::to_value(MixPayload::patch(&mix)).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["type"], "photo");
        assert_eq!(json["photo_url"], "photos/a.jpg");
        assert!(json["video_url"].is_null());
    }

    #[test]
    fn test_create_payload_keeps_id() {
        let mix = Mix::new("m1", MixType::Text, Utc.timestamp_millis_opt(0).unwrap());
        let json = serde_json::to_value(MixPayload::create(&mix)).unwrap();
        assert_eq!(json["id"], "m1");
    }

    #[test]
    fn test_eq_filter_encodes_value() {
        assert_eq!(eq_filter("a b&c"), "eq.a%20b%26c");
    }
}
