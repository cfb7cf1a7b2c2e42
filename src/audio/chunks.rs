//! Ordered accumulation of audio chunks for one recording session.
//!
//! Unlike a ring buffer, [`ChunkBuffer`] never discards data: a lecture
//! recording must be kept whole, so chunks grow unbounded and are
//! concatenated in strict arrival order when the session is finalized.
//!
//! # Example
//!
//! ```rust
//! use lecture_assistant::audio::ChunkBuffer;
//!
//! let mut buf = ChunkBuffer::new();
//! buf.push(vec![1.0, 2.0]);
//! buf.push(vec![3.0]);
//! assert_eq!(buf.finalize(), vec![1.0, 2.0, 3.0]);
//! ```

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// Append-only buffer of `f32` sample chunks.
///
/// Chunks keep their arrival order; [`finalize`](Self::finalize) concatenates
/// them into a single flat sample vector in that order.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<f32>>,
    /// Total samples across all chunks (kept so the duration counter does not
    /// have to walk the chunk list).
    samples: usize,
}

impl ChunkBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk, preserving arrival order.
    pub fn push(&mut self, chunk: Vec<f32>) {
        self.samples += chunk.len();
        self.chunks.push(chunk);
    }

    /// Total number of samples accumulated so far.
    pub fn len_samples(&self) -> usize {
        self.samples
    }

    /// Number of chunks accumulated so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` when no samples have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Elapsed whole seconds of audio, given `sample_rate` Hz and `channels`
    /// interleaved channels.
    pub fn duration_secs(&self, sample_rate: u32, channels: u16) -> u64 {
        let per_second = sample_rate as usize * channels.max(1) as usize;
        if per_second == 0 {
            return 0;
        }
        (self.samples / per_second) as u64
    }

    /// Discard all chunks.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.samples = 0;
    }

    /// Concatenate all chunks in arrival order, consuming the buffer.
    pub fn finalize(&mut self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.samples);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(&chunk);
        }
        self.samples = 0;
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
