//! In-memory audio source

use std::collections::VecDeque;

use crate::error::StreamResult;
use crate::types::AudioFrame;

/// Plays back a fixed list of chunks, then ends
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: VecDeque<AudioFrame>,
}

impl MemorySource {
    pub fn new(chunks: Vec<AudioFrame>) -> Self {
        Self { chunks: chunks.into() }
    }

    /// Split a signal into `chunk_len`-sample chunks, zero-padding the last
    pub fn from_samples(samples: &[f32], chunk_len: usize, sample_rate: f32) -> Self {
        let chunk_len = chunk_len.max(1);
        let chunks = samples
            .chunks(chunk_len)
            .map(|chunk| {
                let mut padded = chunk.to_vec();
                padded.resize(chunk_len, 0.0);
                AudioFrame::new(padded, sample_rate)
            })
            .collect();
        Self { chunks }
    }

    /// Chunks not yet pulled
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl Iterator for MemorySource {
    type Item = StreamResult<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_pads_last_chunk() {
        let samples: Vec<f32> = (1..=5).map(|i| i as f32).collect();
        let mut source = MemorySource::from_samples(&samples, 2, 8000.0);
        assert_eq!(source.remaining(), 3);

        let chunks: Vec<AudioFrame> = source.by_ref().map(|c| c.unwrap()).collect();
        assert_eq!(chunks[0].as_slice(), &[1.0, 2.0]);
        assert_eq!(chunks[2].as_slice(), &[5.0, 0.0]);
        assert!(chunks.iter().all(|c| c.sample_rate() == 8000.0));
        assert!(source.next().is_none());
    }
}
