//! Audio input - the graph's only suspension point

use crate::capture::AudioStream;
use crate::dsp::preprocess::Preprocessor;
use crate::effect::{EffectNode, NodeBase, NodeInfo, NodeIo, ParamValue, SignalKind};
use crate::error::{ConfigResult, StreamError, StreamResult};
use crate::types::AudioFrame;

/// Tolerance when checking the rate of pulled frames
const RATE_TOLERANCE: f32 = 1e-3;

/// Pulls one frame per tick from an audio stream and publishes it on its
/// single audio output
///
/// `process` blocks until the stream yields, giving backpressure to the
/// whole graph. The frame is pulled at most once per tick; repeated calls
/// re-publish it. Stream end or failure is terminal.
pub struct AudioInputNode {
    base: NodeBase,
    stream: AudioStream,
    sample_rate: f32,
    frame: AudioFrame,
    pulled: bool,
}

impl AudioInputNode {
    /// Pass raw chunks straight through
    pub fn new(stream: AudioStream, sample_rate: f32) -> Self {
        Self {
            base: NodeBase::new(NodeInfo::new("Audio Input", "Source")),
            stream,
            sample_rate,
            frame: AudioFrame::new(Vec::new(), sample_rate),
            pulled: false,
        }
    }

    /// Decimate and frame the chunks before publishing them
    ///
    /// The output rate is the preprocessor's decimated rate.
    pub fn preprocessed(stream: AudioStream, sample_rate: f32, fmax: f32, n_overlaps: usize) -> ConfigResult<Self> {
        let preprocessor = Preprocessor::new(stream, sample_rate, fmax, n_overlaps)?;
        let output_rate = preprocessor.output_rate();
        log::debug!(
            "Audio input: preprocessing {}Hz -> {}Hz ({} overlaps)",
            sample_rate,
            output_rate,
            n_overlaps
        );
        Ok(Self::new(Box::new(preprocessor), output_rate))
    }

    /// Rate of the published frames
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn pull(&mut self) -> StreamResult<()> {
        let frame = match self.stream.next() {
            Some(result) => result?,
            None => return Err(StreamError::Ended),
        };
        if (frame.sample_rate() - self.sample_rate).abs() > RATE_TOLERANCE {
            return Err(StreamError::RateMismatch {
                expected: self.sample_rate,
                actual: frame.sample_rate(),
            });
        }
        self.frame = frame;
        Ok(())
    }
}

impl EffectNode for AudioInputNode {
    fn num_input_channels(&self) -> usize {
        0
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn input_kind(&self, _port: usize) -> SignalKind {
        SignalKind::ANY_AUDIO
    }

    fn output_kind(&self, _port: usize) -> SignalKind {
        SignalKind::audio(self.sample_rate)
    }

    fn update(&mut self, _dt: f32) {
        self.pulled = false;
    }

    fn process(&mut self, io: &mut NodeIo<'_>) -> StreamResult<()> {
        if !self.pulled {
            self.pull()?;
            self.pulled = true;
        }
        if let Some(out) = io.audio_output(0) {
            out.copy_from(&self.frame);
        }
        Ok(())
    }

    fn info(&self) -> &NodeInfo {
        self.base.info()
    }

    fn params(&self) -> &[ParamValue] {
        self.base.params()
    }

    fn set_param(&mut self, index: usize, value: f32) {
        self.base.set_param(index, value);
    }

    fn reset(&mut self) {
        // Streams cannot rewind; only the published frame is dropped
        self.frame = AudioFrame::new(Vec::new(), self.sample_rate);
        self.pulled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{NodeIo, Signal};

    fn stream(frames: Vec<AudioFrame>) -> AudioStream {
        Box::new(frames.into_iter().map(Ok))
    }

    fn process(node: &mut AudioInputNode) -> StreamResult<Signal> {
        let mut outputs = vec![Signal::for_kind(node.output_kind(0), 0)];
        let mut io = NodeIo::new(&[], &[], &mut outputs);
        node.process(&mut io)?;
        Ok(outputs.swap_remove(0))
    }

    #[test]
    fn test_pulls_once_per_tick() {
        let frames = vec![
            AudioFrame::new(vec![0.1; 4], 1000.0),
            AudioFrame::new(vec![0.2; 4], 1000.0),
        ];
        let mut node = AudioInputNode::new(stream(frames), 1000.0);

        node.update(0.01);
        let a = process(&mut node).unwrap();
        let b = process(&mut node).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_audio().unwrap().as_slice(), &[0.1; 4]);

        node.update(0.01);
        let c = process(&mut node).unwrap();
        assert_eq!(c.as_audio().unwrap().as_slice(), &[0.2; 4]);

        node.update(0.01);
        assert_eq!(process(&mut node), Err(StreamError::Ended));
    }

    #[test]
    fn test_rate_mismatch_is_terminal() {
        let mut node = AudioInputNode::new(stream(vec![AudioFrame::new(vec![0.0; 4], 44100.0)]), 48000.0);
        node.update(0.01);
        assert!(matches!(process(&mut node), Err(StreamError::RateMismatch { .. })));
    }

    #[test]
    fn test_preprocessed_rate() {
        let frames = (0..3).map(|_| AudioFrame::new(vec![0.0; 800], 48000.0)).collect();
        let mut node = AudioInputNode::preprocessed(stream(frames), 48000.0, 6000.0, 8).unwrap();
        assert_eq!(node.sample_rate(), 12000.0);
        assert_eq!(node.output_kind(0), SignalKind::audio(12000.0));

        node.update(0.01);
        let out = process(&mut node).unwrap();
        let frame = out.as_audio().unwrap();
        assert_eq!(frame.len(), 1600);
        assert_eq!(frame.sample_rate(), 12000.0);
    }

    #[test]
    fn test_source_error_propagates() {
        let failing: AudioStream = Box::new(std::iter::once(Err(StreamError::Capture("device lost".into()))));
        let mut node = AudioInputNode::new(failing, 48000.0);
        node.update(0.01);
        assert_eq!(process(&mut node), Err(StreamError::Capture("device lost".into())));
    }
}
