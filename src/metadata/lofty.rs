//! lofty-backed metadata extractor.
//!
//! Covers the formats in [`crate::scanner::AUDIO_EXTENSIONS`]. The title
//! falls back to the filename stem when the file carries no title tag, so
//! untagged rips still compare against tagged copies by name.

use std::path::Path;

use lofty::error::LoftyError;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::tag::{ItemValue, Tag};

use super::{ExtractError, Extraction, MetadataExtractor};
use crate::cache::{TagMap, TrackMetadata};

/// Extractor reading metadata through lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl LoftyExtractor {
    /// Create a new extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let tagged_file = lofty::read_from_path(path).map_err(|e| lofty_error(path, e))?;
        let properties = tagged_file.properties();

        let mut metadata = TrackMetadata {
            duration_secs: properties.duration().as_secs_f64(),
            bitrate_kbps: properties
                .audio_bitrate()
                .or(properties.overall_bitrate())
                .unwrap_or(0),
            ..Default::default()
        };
        let mut current_tags = TagMap::new();

        if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            metadata.title = get_string(tag, &ItemKey::TrackTitle);
            metadata.artist = get_string(tag, &ItemKey::TrackArtist);
            metadata.album_artist = get_string(tag, &ItemKey::AlbumArtist);
            metadata.album = get_string(tag, &ItemKey::AlbumTitle);
            metadata.track_number = get_string(tag, &ItemKey::TrackNumber);
            metadata.year = get_string(tag, &ItemKey::Year);
            if metadata.year.is_empty() {
                metadata.year = get_string(tag, &ItemKey::RecordingDate);
            }

            // Non-standard frames carry the custom tag vocabulary.
            for item in tag.items() {
                if let ItemKey::Unknown(name) = item.key() {
                    if let ItemValue::Text(value) = item.value() {
                        // First occurrence wins, matching first-value semantics.
                        current_tags
                            .entry(name.to_lowercase())
                            .or_insert_with(|| value.clone());
                    }
                }
            }
        }

        if metadata.title.is_empty() {
            metadata.title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        Ok(Extraction {
            metadata,
            current_tags,
        })
    }
}

fn get_string(tag: &Tag, key: &ItemKey) -> String {
    tag.get_string(key).unwrap_or_default().to_string()
}

fn lofty_error(path: &Path, err: LoftyError) -> ExtractError {
    match err.kind() {
        lofty::error::ErrorKind::Io(_) => {
            // Rebuild the io::Error; LoftyError does not give it back by value.
            ExtractError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
            }
        }
        _ => ExtractError::Unparseable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}
