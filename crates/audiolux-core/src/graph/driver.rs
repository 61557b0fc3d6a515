//! Driver loop - ticks a graph against the wall clock
//!
//! The pace is set by the audio input: each tick blocks until the next
//! chunk arrives, and `dt` is whatever wall-clock time that took.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Graph;
use crate::error::StreamError;
use crate::types::PixelBuffer;

/// Cloneable flag asking a running driver to stop
///
/// Checked between ticks; a tick blocked on audio finishes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a driver loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The stop handle was triggered
    Requested,
    /// The sink returned `ControlFlow::Break`
    Sink,
    /// The audio stream ended or failed
    Stream(StreamError),
}

/// Summary of a finished driver run
#[derive(Debug, Clone, PartialEq)]
pub struct DriverStats {
    /// Ticks whose frame reached the sink
    pub ticks: u64,
    pub elapsed: Duration,
    pub reason: StopReason,
}

/// Owns a graph and runs it until stopped
pub struct Driver {
    graph: Graph,
    stop: StopHandle,
}

impl Driver {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            stop: StopHandle::new(),
        }
    }

    /// Handle that stops this driver from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Tick until the stop handle fires, the sink breaks or the stream ends
    ///
    /// Every frame is handed to `sink`, typically the LED output driver.
    pub fn run<F>(&mut self, mut sink: F) -> DriverStats
    where
        F: FnMut(&PixelBuffer) -> ControlFlow<()>,
    {
        log::info!("Driver: starting ({} pixels)", self.graph.num_pixels());
        let start = Instant::now();
        let mut last = start;
        let mut ticks = 0u64;

        let reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Requested;
            }

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;

            match self.graph.tick(dt) {
                Ok(frame) => {
                    ticks += 1;
                    if sink(frame).is_break() {
                        break StopReason::Sink;
                    }
                }
                Err(e) => break StopReason::Stream(e),
            }
        };

        let stats = DriverStats {
            ticks,
            elapsed: start.elapsed(),
            reason,
        };
        match &stats.reason {
            StopReason::Stream(StreamError::Ended) | StopReason::Requested | StopReason::Sink => {
                log::info!("Driver: stopped after {} ticks ({:?})", stats.ticks, stats.reason)
            }
            StopReason::Stream(e) => log::warn!("Driver: stopped after {} ticks: {}", stats.ticks, e),
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemorySource;
    use crate::effect::nodes::{AudioInputNode, LevelMeterNode, MeterMode};
    use crate::graph::GraphBuilder;
    use crate::types::AudioFrame;

    fn meter_graph(chunks: usize) -> Graph {
        let frames = (0..chunks).map(|_| AudioFrame::new(vec![0.5; 64], 1000.0)).collect();
        GraphBuilder::new(8)
            .node("in", Box::new(AudioInputNode::new(Box::new(MemorySource::new(frames)), 1000.0)))
            .node("vu", Box::new(LevelMeterNode::new(8, MeterMode::Peak, 60.0).unwrap()))
            .connect(("in", 0), ("vu", 0))
            .output(("vu", 0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_runs_until_stream_ends() {
        let mut driver = Driver::new(meter_graph(3));
        let mut lit = Vec::new();
        let stats = driver.run(|frame| {
            lit.push(frame.iter().filter(|c| c.r > 0.0).count());
            ControlFlow::Continue(())
        });
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.reason, StopReason::Stream(StreamError::Ended));
        assert!(lit.iter().all(|&n| n > 0));
    }

    #[test]
    fn test_sink_can_stop() {
        let mut driver = Driver::new(meter_graph(10));
        let mut seen = 0;
        let stats = driver.run(|_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.reason, StopReason::Sink);
    }

    #[test]
    fn test_stop_handle() {
        let mut driver = Driver::new(meter_graph(10));
        let handle = driver.stop_handle();
        let stats = driver.run(|_| {
            handle.stop();
            ControlFlow::Continue(())
        });
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.reason, StopReason::Requested);
        assert!(driver.stop_handle().is_stopped());
    }
}
