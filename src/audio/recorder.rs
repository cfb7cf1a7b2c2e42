//! Recording session lifecycle — start, accumulate, stop, finalize.
//!
//! [`AudioRecorder`] owns at most one [`RecordingSession`] at a time.  While
//! a session is active, chunks delivered by the [`CaptureBackend`] are
//! appended to a [`ChunkBuffer`] in arrival order by a collector thread, and
//! the elapsed-time counter is derived from the accumulated sample count.
//!
//! Stopping a session releases the device handle *first*, unconditionally,
//! and only then finalizes the accumulated chunks into an [`AudioArtifact`]
//! — a WAV container around the concatenated samples.  Wrapping is
//! containerization, not transcoding: the samples are stored bit-identical
//! to the ordered concatenation of the captured chunks.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::audio::capture::{AudioChunk, CaptureBackend, CaptureError, CaptureStream};
use crate::audio::chunks::ChunkBuffer;

// ---------------------------------------------------------------------------
// AudioArtifact
// ---------------------------------------------------------------------------

/// A finalized audio payload ready for submission to the remote service.
///
/// Immutable once created.  Produced either by stopping a recording session
/// (synthetic `recording_<unix-secs>.wav` filename) or by ingesting a file
/// from disk (original filename).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    /// Complete encoded audio file content.
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `audio/wav` or `audio/mpeg`.
    pub media_type: String,
    /// Filename sent with the multipart upload.
    pub file_name: String,
}

impl AudioArtifact {
    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Duration formatting
// ---------------------------------------------------------------------------

/// Format elapsed seconds as `m:ss` for the recording timer display.
///
/// ```
/// use lecture_assistant::audio::format_duration;
///
/// assert_eq!(format_duration(125), "2:05");
/// assert_eq!(format_duration(0), "0:00");
/// ```
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

// ---------------------------------------------------------------------------
// RecordingSession
// ---------------------------------------------------------------------------

/// Transient state of an in-progress capture.
///
/// Exists only between `start` and `stop`; holds the exclusive device handle
/// and the chunk accumulation shared with the collector thread.
struct RecordingSession {
    /// Exclusive device handle.  Dropped (exactly once, by move) in `stop`.
    stream: Box<dyn CaptureStream>,
    /// Chunks accumulated in arrival order.
    buffer: Arc<Mutex<ChunkBuffer>>,
    /// Thread draining the capture channel into `buffer`.
    collector: Option<thread::JoinHandle<()>>,
    sample_rate: u32,
    channels: u16,
}

// ---------------------------------------------------------------------------
// AudioRecorder
// ---------------------------------------------------------------------------

/// Manages the microphone lifecycle for the workflow engine.
///
/// At most one session can be active; the device handle is exclusively owned
/// by that session and released unconditionally when it ends.
pub struct AudioRecorder {
    backend: Box<dyn CaptureBackend>,
    session: Option<RecordingSession>,
}

impl AudioRecorder {
    /// Create a recorder on top of `backend`.
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// Returns `true` while a recording session is active.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Whole seconds of audio accumulated by the active session (0 when
    /// idle).  1-second resolution, derived from the sample count so the
    /// value is deterministic under test.
    pub fn elapsed_secs(&self) -> u64 {
        match &self.session {
            Some(s) => s
                .buffer
                .lock()
                .map(|b| b.duration_secs(s.sample_rate, s.channels))
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Acquire the device and begin buffering chunks.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::DeviceUnavailable`] when a session is already active
    ///   (the existing session is left untouched) or the platform has no
    ///   usable input device.
    /// - [`CaptureError::PermissionDenied`] when the platform refuses
    ///   microphone access.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::DeviceUnavailable(
                "capture already in progress".into(),
            ));
        }

        let (tx, rx) = mpsc::channel::<AudioChunk>();
        let stream = self.backend.open(tx)?;
        let sample_rate = stream.sample_rate();
        let channels = stream.channels();

        let buffer = Arc::new(Mutex::new(ChunkBuffer::new()));
        let buffer_clone = Arc::clone(&buffer);

        let collector = thread::Builder::new()
            .name("chunk-collector".into())
            .spawn(move || {
                while let Ok(chunk) = rx.recv() {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        buf.push(chunk.samples);
                    }
                }
            })
            .map_err(|e| {
                CaptureError::Stream(format!("failed to spawn collector thread: {e}"))
            })?;

        log::info!("recording started ({sample_rate} Hz, {channels} ch)");

        self.session = Some(RecordingSession {
            stream,
            buffer,
            collector: Some(collector),
            sample_rate,
            channels,
        });
        Ok(())
    }

    /// Stop the active session and finalize it into an [`AudioArtifact`].
    ///
    /// The device handle is released before finalization, so a finalize
    /// failure can never leak the device.  The collector thread is joined
    /// after the channel closes, which guarantees every chunk sent before
    /// the stop is included, in arrival order.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotRecording`] when no session is active.
    /// - [`CaptureError::Finalize`] when the accumulated audio cannot be
    ///   encoded (the device has already been released at that point).
    pub fn stop(&mut self) -> Result<AudioArtifact, CaptureError> {
        let mut session = self.session.take().ok_or(CaptureError::NotRecording)?;

        // Release the device before any fallible work.
        drop(session.stream);

        // The capture side of the channel is gone; drain what was queued.
        if let Some(collector) = session.collector.take() {
            let _ = collector.join();
        }

        let samples = session
            .buffer
            .lock()
            .map(|mut b| b.finalize())
            .unwrap_or_default();
        let secs = samples.len() / (session.sample_rate.max(1) as usize
            * session.channels.max(1) as usize);
        log::info!("recording stopped ({} samples, ~{} s)", samples.len(), secs);

        let bytes = encode_wav(&samples, session.sample_rate, session.channels)?;

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Ok(AudioArtifact {
            bytes,
            media_type: "audio/wav".into(),
            file_name: format!("recording_{ts}.wav"),
        })
    }
}

// ---------------------------------------------------------------------------
// WAV encoding
// ---------------------------------------------------------------------------

/// Wrap `samples` in a 32-bit float WAV container.
///
/// Float samples are written verbatim, so decoding the container yields the
/// exact concatenated capture data.
fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    if sample_rate == 0 || channels == 0 {
        return Err(CaptureError::Finalize(format!(
            "invalid stream configuration ({sample_rate} Hz, {channels} ch)"
        )));
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Finalize(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// MockCaptureBackend  (test-only)
// ---------------------------------------------------------------------------

/// A scripted capture backend that emits preset chunks without touching any
/// hardware.  The `released` flag flips when the session's stream handle is
/// dropped, so tests can assert the device-release invariant.
#[cfg(test)]
pub struct MockCaptureBackend {
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    fail_open: Option<CaptureError>,
    pub released: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MockCaptureBackend {
    /// Backend that delivers `chunks` at `sample_rate` Hz mono.
    pub fn with_chunks(sample_rate: u32, chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks,
            sample_rate,
            channels: 1,
            fail_open: None,
            released: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Backend whose `open` always fails with `error`.
    pub fn failing(error: CaptureError) -> Self {
        Self {
            chunks: Vec::new(),
            sample_rate: 16_000,
            channels: 1,
            fail_open: Some(error),
            released: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Report `channels` instead of mono (0 makes finalization fail, for
    /// error-injection tests).
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }
}

#[cfg(test)]
impl CaptureBackend for MockCaptureBackend {
    fn open(
        &mut self,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if let Some(e) = self.fail_open.take() {
            return Err(e);
        }
        for chunk in &self.chunks {
            let _ = tx.send(AudioChunk {
                samples: chunk.clone(),
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        Ok(Box::new(MockStream {
            _tx: tx,
            sample_rate: self.sample_rate,
            channels: self.channels,
            released: Arc::clone(&self.released),
        }))
    }
}

#[cfg(test)]
struct MockStream {
    /// Keeps the chunk channel open until the handle is dropped.
    _tx: mpsc::Sender<AudioChunk>,
    sample_rate: u32,
    channels: u16,
    released: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl CaptureStream for MockStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(test)]
impl Drop for MockStream {
    fn drop(&mut self) {
        self.released
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn decode_wav(bytes: &[u8]) -> Vec<f32> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("valid wav");
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .expect("float samples")
    }

    // ---- format_duration ---------------------------------------------------

    #[test]
    fn duration_formats_minutes_and_padded_seconds() {
        assert_eq!(format_duration(125), "2:05");
    }

    #[test]
    fn duration_formats_zero() {
        assert_eq!(format_duration(0), "0:00");
    }

    #[test]
    fn duration_formats_sub_minute() {
        assert_eq!(format_duration(59), "0:59");
    }

    #[test]
    fn duration_formats_exact_minute() {
        assert_eq!(format_duration(60), "1:00");
    }

    #[test]
    fn duration_formats_over_an_hour() {
        assert_eq!(format_duration(3_725), "62:05");
    }

    // ---- Finalized artifact content ----------------------------------------

    #[test]
    fn artifact_samples_equal_ordered_chunk_concatenation() {
        let chunks = vec![vec![0.1_f32, 0.2], vec![0.3], vec![0.4, 0.5, 0.6]];
        let expected: Vec<f32> = chunks.iter().flatten().copied().collect();

        let backend = MockCaptureBackend::with_chunks(16_000, chunks);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        let artifact = recorder.stop().expect("stop");

        assert_eq!(decode_wav(&artifact.bytes), expected);
        assert_eq!(artifact.media_type, "audio/wav");
        assert!(artifact.file_name.starts_with("recording_"));
        assert!(artifact.file_name.ends_with(".wav"));
    }

    #[test]
    fn empty_session_produces_empty_wav() {
        let backend = MockCaptureBackend::with_chunks(16_000, vec![]);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        let artifact = recorder.stop().expect("stop");

        assert!(decode_wav(&artifact.bytes).is_empty());
        assert!(!artifact.bytes.is_empty(), "container header still present");
    }

    // ---- Device release invariant ------------------------------------------

    #[test]
    fn stop_releases_device_handle() {
        let backend = MockCaptureBackend::with_chunks(16_000, vec![vec![0.0; 8]]);
        let released = Arc::clone(&backend.released);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        assert!(!released.load(Ordering::SeqCst));

        recorder.stop().expect("stop");
        assert!(released.load(Ordering::SeqCst));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn stop_releases_device_even_when_finalize_fails() {
        // 0 channels makes WAV encoding fail after the handle is dropped.
        let backend =
            MockCaptureBackend::with_chunks(16_000, vec![vec![0.0; 8]]).with_channels(0);
        let released = Arc::clone(&backend.released);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        let result = recorder.stop();

        assert!(matches!(result, Err(CaptureError::Finalize(_))));
        assert!(released.load(Ordering::SeqCst), "handle must not leak");
        assert!(!recorder.is_recording());
    }

    #[test]
    fn stop_without_session_is_not_recording() {
        let backend = MockCaptureBackend::with_chunks(16_000, vec![]);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        assert!(matches!(recorder.stop(), Err(CaptureError::NotRecording)));
    }

    // ---- Exclusive ownership -----------------------------------------------

    #[test]
    fn second_start_fails_and_leaves_session_intact() {
        let chunks = vec![vec![0.5_f32; 4]];
        let backend = MockCaptureBackend::with_chunks(16_000, chunks.clone());
        let released = Arc::clone(&backend.released);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        let err = recorder.start().unwrap_err();

        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(recorder.is_recording(), "existing session untouched");
        assert!(!released.load(Ordering::SeqCst));

        // The original session still finalizes with its own chunks.
        let artifact = recorder.stop().expect("stop");
        assert_eq!(decode_wav(&artifact.bytes), chunks[0]);
    }

    #[test]
    fn failed_open_leaves_recorder_idle() {
        let backend = MockCaptureBackend::failing(CaptureError::PermissionDenied(
            "user refused".into(),
        ));
        let mut recorder = AudioRecorder::new(Box::new(backend));

        assert!(matches!(
            recorder.start(),
            Err(CaptureError::PermissionDenied(_))
        ));
        assert!(!recorder.is_recording());
    }

    // ---- Elapsed time ------------------------------------------------------

    #[test]
    fn elapsed_secs_derives_from_sample_count() {
        // 125 s of mono audio at 100 Hz = 12 500 samples.
        let backend = MockCaptureBackend::with_chunks(100, vec![vec![0.0; 12_500]]);
        let mut recorder = AudioRecorder::new(Box::new(backend));

        recorder.start().expect("start");
        // Collector drains the scripted chunks; poll briefly until it has.
        for _ in 0..100 {
            if recorder.elapsed_secs() == 125 {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(recorder.elapsed_secs(), 125);
        assert_eq!(format_duration(recorder.elapsed_secs()), "2:05");

        recorder.stop().expect("stop");
        assert_eq!(recorder.elapsed_secs(), 0);
    }
}
