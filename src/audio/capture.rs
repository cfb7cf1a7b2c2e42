//! Microphone capture via `cpal`.
//!
//! [`MicBackend`] wraps the cpal host/device/stream lifecycle behind the
//! [`CaptureBackend`] trait so the recorder can be driven by a test double
//! instead of real hardware.  Opening a backend starts streaming
//! [`AudioChunk`]s over an mpsc channel; the returned [`CaptureStream`] is a
//! RAII guard — dropping it releases the underlying device.
//!
//! `cpal::Stream` is not `Send`, so [`MicBackend::open`] parks the stream on
//! a dedicated thread and hands back a handle that is safe to hold from the
//! workflow engine's async task.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.  Chunks are
/// accumulated in arrival order by [`crate::audio::ChunkBuffer`] and
/// concatenated unchanged when a recording session is finalized.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring or running the audio capture.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The platform refused microphone access.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No input device is available, or the device is already held by an
    /// active recording session.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The stream could not be configured or started.
    #[error("failed to start audio stream: {0}")]
    Stream(String),

    /// `stop` was called without an active recording session.
    #[error("no recording in progress")]
    NotRecording,

    /// Finalizing the accumulated audio into an artifact failed.
    #[error("failed to finalize recording: {0}")]
    Finalize(String),
}

/// Classify a backend-specific error description into the capture taxonomy.
///
/// cpal surfaces OS permission refusals as backend-specific strings, so the
/// match is necessarily textual.
fn classify_backend_error(description: String) -> CaptureError {
    let lower = description.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted")
    {
        CaptureError::PermissionDenied(description)
    } else {
        CaptureError::Stream(description)
    }
}

impl From<cpal::DefaultStreamConfigError> for CaptureError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("device disappeared".into())
            }
            cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
                CaptureError::Stream("input stream type not supported".into())
            }
            cpal::DefaultStreamConfigError::BackendSpecific { err } => {
                classify_backend_error(err.description)
            }
        }
    }
}

impl From<cpal::BuildStreamError> for CaptureError {
    fn from(e: cpal::BuildStreamError) -> Self {
        match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("device disappeared".into())
            }
            cpal::BuildStreamError::BackendSpecific { err } => {
                classify_backend_error(err.description)
            }
            other => CaptureError::Stream(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for CaptureError {
    fn from(e: cpal::PlayStreamError) -> Self {
        match e {
            cpal::PlayStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("device disappeared".into())
            }
            cpal::PlayStreamError::BackendSpecific { err } => {
                classify_backend_error(err.description)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureBackend / CaptureStream traits
// ---------------------------------------------------------------------------

/// An exclusive handle to a live capture stream.
///
/// Dropping the handle releases the underlying device.  This is the only way
/// the device is released, so release happens exactly once per session by
/// ownership.
pub trait CaptureStream: Send + Sync {
    /// Native sample rate of the stream in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of interleaved channels in each [`AudioChunk`].
    fn channels(&self) -> u16;
}

/// Source of [`AudioChunk`]s — a microphone in production, a scripted double
/// in tests.
///
/// `open` acquires the device exclusively and starts delivering chunks to
/// `tx` in arrival order until the returned [`CaptureStream`] is dropped.
pub trait CaptureBackend: Send + Sync {
    fn open(
        &mut self,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

// ---------------------------------------------------------------------------
// MicBackend
// ---------------------------------------------------------------------------

/// Microphone capture backend built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use lecture_assistant::audio::{AudioChunk, CaptureBackend, MicBackend};
///
/// let (tx, rx) = mpsc::channel::<AudioChunk>();
/// let mut backend = MicBackend::new(None);
/// let _stream = backend.open(tx).unwrap();
/// // `_stream` keeps the device held; drop it to stop capturing.
/// ```
pub struct MicBackend {
    /// Input device name from config — `None` selects the system default.
    device_name: Option<String>,
}

impl MicBackend {
    /// Create a backend targeting `device_name`, or the default input device
    /// when `None`.
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

impl CaptureBackend for MicBackend {
    /// Acquire the device and start streaming chunks to `tx`.
    ///
    /// The cpal stream is created and owned by a dedicated `mic-capture`
    /// thread; setup errors are reported back synchronously before this
    /// method returns.  Send errors inside the audio callback (receiver
    /// dropped) are silently ignored so the audio thread never panics.
    fn open(
        &mut self,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u16), CaptureError>>();
        let (hold_tx, hold_rx) = mpsc::channel::<()>();
        let device_name = self.device_name.clone();

        let join = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || match build_stream(device_name.as_deref(), tx) {
                Ok((stream, sample_rate, channels)) => {
                    let _ = ready_tx.send(Ok((sample_rate, channels)));
                    // Park until the handle is dropped, then release the
                    // device by dropping the stream on this thread.
                    let _ = hold_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| CaptureError::Stream(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok((sample_rate, channels))) => Ok(Box::new(MicStream {
                hold: Some(hold_tx),
                join: Some(join),
                sample_rate,
                channels,
            })),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(CaptureError::Stream("capture thread exited early".into()))
            }
        }
    }
}

/// Open the input device, query its preferred configuration and start an
/// `f32` input stream that forwards each hardware buffer as an [`AudioChunk`].
fn build_stream(
    device_name: Option<&str>,
    tx: mpsc::Sender<AudioChunk>,
) -> Result<(cpal::Stream, u32, u16), CaptureError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Stream(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
            })?,
        None => host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no default input device".into())
        })?,
    };

    let supported = device.default_input_config()?;
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let chunk = AudioChunk {
                samples: data.to_vec(),
                sample_rate,
                channels,
            };
            // Ignore send errors; the receiver may have been dropped.
            let _ = tx.send(chunk);
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None, // no timeout
    )?;

    stream.play()?;
    Ok((stream, sample_rate, channels))
}

// ---------------------------------------------------------------------------
// MicStream
// ---------------------------------------------------------------------------

/// RAII guard for a live microphone stream.
///
/// Dropping this handle closes the hold channel, which unparks the capture
/// thread and drops the `cpal::Stream` there.
struct MicStream {
    hold: Option<mpsc::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    sample_rate: u32,
    channels: u16,
}

impl CaptureStream for MicStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for MicStream {
    fn drop(&mut self) {
        // The hold channel must close before the join, or the capture
        // thread would still be parked on it.  Joining makes the device
        // fully released before control returns to the caller.
        drop(self.hold.take());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
