//! Shared capture snapshots
//!
//! One capture callback feeds any number of graphs. The writer publishes
//! each hardware block as an immutable `Arc<[f32]>`; every reader blocks
//! until a generation newer than the last one it saw is available.
//!
//! Readers that fall behind skip to the newest snapshot; nothing queues.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{StreamError, StreamResult};
use crate::types::AudioFrame;

#[derive(Debug)]
struct SnapshotState {
    generation: u64,
    samples: Arc<[f32]>,
    closed: bool,
    error: Option<String>,
}

#[derive(Debug)]
struct Shared {
    sample_rate: f32,
    state: Mutex<SnapshotState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SnapshotState> {
        // Every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a writer and a first reader for audio at `sample_rate`
pub fn snapshot_channel(sample_rate: f32) -> (SnapshotWriter, SnapshotReader) {
    let shared = Arc::new(Shared {
        sample_rate,
        state: Mutex::new(SnapshotState {
            generation: 0,
            samples: Arc::from(Vec::new()),
            closed: false,
            error: None,
        }),
        ready: Condvar::new(),
    });
    let reader = SnapshotReader {
        shared: Arc::clone(&shared),
        seen: 0,
    };
    (SnapshotWriter { shared }, reader)
}

/// Publishing side, held by the capture callback
///
/// Not `Clone`: there is exactly one writer. Dropping it ends every
/// reader's stream.
#[derive(Debug)]
pub struct SnapshotWriter {
    shared: Arc<Shared>,
}

impl SnapshotWriter {
    /// Publish a copy of `samples` as the next generation
    pub fn publish(&self, samples: &[f32]) {
        self.publish_arc(Arc::from(samples));
    }

    pub fn publish_arc(&self, samples: Arc<[f32]>) {
        let mut state = self.shared.lock();
        state.samples = samples;
        state.generation += 1;
        drop(state);
        self.shared.ready.notify_all();
    }

    /// End every reader's stream with a capture error
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.shared.lock();
        if state.error.is_none() {
            state.error = Some(message.into());
        }
        state.closed = true;
        drop(state);
        self.shared.ready.notify_all();
    }

    /// End every reader's stream normally
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_all();
    }

    pub fn sample_rate(&self) -> f32 {
        self.shared.sample_rate
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consuming side, one per graph
///
/// Cloning gives an independent reader at the same position.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    shared: Arc<Shared>,
    seen: u64,
}

impl SnapshotReader {
    /// Block until a newer snapshot than the last one returned is available
    ///
    /// Snapshots already published stay readable after the writer closes;
    /// only then does the stream end.
    pub fn next_snapshot(&mut self) -> StreamResult<Arc<[f32]>> {
        let mut state = self.shared.lock();
        loop {
            if state.generation > self.seen {
                self.seen = state.generation;
                return Ok(Arc::clone(&state.samples));
            }
            if let Some(error) = &state.error {
                return Err(StreamError::Capture(error.clone()));
            }
            if state.closed {
                return Err(StreamError::Ended);
            }
            state = self
                .shared
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.shared.sample_rate
    }
}

impl Iterator for SnapshotReader {
    type Item = StreamResult<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_snapshot() {
            Ok(samples) => Some(Ok(AudioFrame::new(samples.to_vec(), self.shared.sample_rate))),
            Err(StreamError::Ended) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_reader_blocks_for_next_generation() {
        let (writer, reader) = snapshot_channel(48000.0);
        let handle = thread::spawn(move || reader.map(|f| f.unwrap()).collect::<Vec<_>>());

        writer.publish(&[0.1, 0.2]);
        drop(writer);

        let frames = handle.join().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_slice(), &[0.1, 0.2]);
        assert_eq!(frames[0].sample_rate(), 48000.0);
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let (writer, mut reader) = snapshot_channel(1000.0);
        writer.publish(&[1.0]);
        writer.publish(&[2.0]);
        assert_eq!(&*reader.next_snapshot().unwrap(), &[2.0]);

        writer.publish(&[3.0]);
        drop(writer);
        // Published data is still delivered after the writer is gone
        assert_eq!(&*reader.next_snapshot().unwrap(), &[3.0]);
        assert_eq!(reader.next_snapshot(), Err(StreamError::Ended));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_clones_read_independently() {
        let (writer, mut a) = snapshot_channel(1000.0);
        let mut b = a.clone();
        writer.publish(&[0.5; 4]);

        let from_a = a.next_snapshot().unwrap();
        let from_b = b.next_snapshot().unwrap();
        // Both readers share the same allocation
        assert!(Arc::ptr_eq(&from_a, &from_b));
    }

    #[test]
    fn test_failure_reaches_readers() {
        let (writer, mut reader) = snapshot_channel(1000.0);
        writer.fail("device unplugged");
        assert_eq!(
            reader.next(),
            Some(Err(StreamError::Capture("device unplugged".to_string())))
        );
    }
}
