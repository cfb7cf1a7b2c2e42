//! Ingestion selector — normalizes the three audio input paths.
//!
//! A lecture can arrive as a dragged-and-dropped file, a file picked from a
//! browse dialog, or a finalized live recording.  [`normalize`] turns any of
//! them into one canonical [`AudioArtifact`], validating dropped and browsed
//! sources by declared media type (`audio/*`).  Non-audio sources are
//! silently ignored — no artifact, no error — matching the drop-target
//! behaviour users expect.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::AudioArtifact;

// ---------------------------------------------------------------------------
// IngestError
// ---------------------------------------------------------------------------

/// Errors surfaced while reading an ingested file from disk.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read audio file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// IngestSource
// ---------------------------------------------------------------------------

/// One audio source event, as produced by the frontend.
#[derive(Debug)]
pub enum IngestSource {
    /// A file dropped onto the capture area, with the media type the drop
    /// event declared for it.
    Dropped { path: PathBuf, media_type: String },
    /// A file chosen through the browse dialog (type inferred from the
    /// extension; the dialog itself filters on `audio/*`).
    Browsed { path: PathBuf },
    /// A finalized live recording, already a canonical artifact.
    Recorded(AudioArtifact),
}

// ---------------------------------------------------------------------------
// Media types
// ---------------------------------------------------------------------------

/// Returns `true` when `media_type` matches the audio type pattern.
pub fn is_audio_media_type(media_type: &str) -> bool {
    media_type.starts_with("audio/")
}

/// Infer a media type from a file extension.
///
/// Covers the formats the capture surface advertises (MP3, WAV, M4A) plus
/// the common free codecs.  Returns `None` for anything else.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "m4a" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Normalize one source event into at most one [`AudioArtifact`].
///
/// Returns `Ok(None)` when the source is not audio (silently ignored) and
/// `Err` only when an accepted file cannot be read.  Exactly one artifact is
/// produced per accepted user action.
pub fn normalize(source: IngestSource) -> Result<Option<AudioArtifact>, IngestError> {
    match source {
        IngestSource::Recorded(artifact) => Ok(Some(artifact)),

        IngestSource::Dropped { path, media_type } => {
            if !is_audio_media_type(&media_type) {
                log::debug!("ignoring non-audio drop: {} ({media_type})", path.display());
                return Ok(None);
            }
            read_artifact(&path, media_type).map(Some)
        }

        IngestSource::Browsed { path } => match media_type_for_path(&path) {
            Some(media_type) => read_artifact(&path, media_type.to_string()).map(Some),
            None => {
                log::debug!("ignoring non-audio selection: {}", path.display());
                Ok(None)
            }
        },
    }
}

/// Read `path` into an artifact carrying its original filename.
fn read_artifact(path: &Path, media_type: String) -> Result<AudioArtifact, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lecture.bin".into());

    Ok(AudioArtifact {
        bytes,
        media_type,
        file_name,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write test file");
        path
    }

    // ---- Media type helpers ------------------------------------------------

    #[test]
    fn audio_pattern_accepts_audio_types() {
        assert!(is_audio_media_type("audio/mpeg"));
        assert!(is_audio_media_type("audio/wav"));
        assert!(is_audio_media_type("audio/x-custom"));
    }

    #[test]
    fn audio_pattern_rejects_other_types() {
        assert!(!is_audio_media_type("video/mp4"));
        assert!(!is_audio_media_type("application/pdf"));
        assert!(!is_audio_media_type("text/plain"));
    }

    #[test]
    fn media_type_inferred_from_extension() {
        assert_eq!(media_type_for_path(Path::new("a.mp3")), Some("audio/mpeg"));
        assert_eq!(media_type_for_path(Path::new("a.WAV")), Some("audio/wav"));
        assert_eq!(media_type_for_path(Path::new("a.m4a")), Some("audio/mp4"));
        assert_eq!(media_type_for_path(Path::new("notes.pdf")), None);
        assert_eq!(media_type_for_path(Path::new("noext")), None);
    }

    // ---- normalize ---------------------------------------------------------

    #[test]
    fn recorded_artifact_passes_through_unchanged() {
        let artifact = AudioArtifact {
            bytes: vec![1, 2, 3],
            media_type: "audio/wav".into(),
            file_name: "recording_1.wav".into(),
        };
        let normalized = normalize(IngestSource::Recorded(artifact.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(normalized, artifact);
    }

    #[test]
    fn dropped_audio_file_is_read_with_original_name() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "lecture.mp3", b"mp3-bytes");

        let artifact = normalize(IngestSource::Dropped {
            path,
            media_type: "audio/mpeg".into(),
        })
        .unwrap()
        .unwrap();

        assert_eq!(artifact.bytes, b"mp3-bytes");
        assert_eq!(artifact.media_type, "audio/mpeg");
        assert_eq!(artifact.file_name, "lecture.mp3");
    }

    #[test]
    fn non_audio_drop_is_silently_ignored() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "slides.pdf", b"%PDF");

        let result = normalize(IngestSource::Dropped {
            path,
            media_type: "application/pdf".into(),
        })
        .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn browsed_audio_file_infers_media_type() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "seminar.wav", b"RIFF-ish");

        let artifact = normalize(IngestSource::Browsed { path }).unwrap().unwrap();

        assert_eq!(artifact.media_type, "audio/wav");
        assert_eq!(artifact.file_name, "seminar.wav");
    }

    #[test]
    fn browsed_unknown_extension_is_ignored() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "notes.txt", b"hello");

        assert!(normalize(IngestSource::Browsed { path }).unwrap().is_none());
    }

    #[test]
    fn missing_accepted_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.mp3");

        let err = normalize(IngestSource::Dropped {
            path,
            media_type: "audio/mpeg".into(),
        })
        .unwrap_err();

        assert!(matches!(err, IngestError::Read { .. }));
    }
}
