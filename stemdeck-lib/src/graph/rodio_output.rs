//! Mixer graph rendered through the default `rodio` output stream.
//!
//! Gain nodes are atomic gain cells shared with the audio thread. Each
//! source is a `rodio::Source` that walks its stem buffer from the requested
//! offset and is added to the output stream's mixer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use rodio::{OutputStream, OutputStreamBuilder, Source};

use crate::audio::StemBuffer;
use crate::error::MixerError;

use super::{GainNodeId, MixerBackend, SourceEvent, SourceId, SourceRequest};

const OUTPUT_STREAM_OPEN_RETRIES: usize = 20;
const OUTPUT_STREAM_OPEN_RETRY_MS: u64 = 100;

/// An `f32` readable from the audio thread without locking.
#[derive(Debug)]
struct AtomicGain(AtomicU32);

impl AtomicGain {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct GainCell {
    gain: AtomicGain,
    connected: AtomicBool,
}

#[derive(Debug, Default)]
struct SourceControl {
    stop: AtomicBool,
    finished: AtomicBool,
}

/// One-shot stem source fed to the output mixer.
struct StemSource {
    id: SourceId,
    buffer: Arc<StemBuffer>,
    position: usize,
    node: Arc<GainCell>,
    master: Arc<AtomicGain>,
    control: Arc<SourceControl>,
    on_ended: Option<Sender<SourceEvent>>,
}

impl StemSource {
    fn finish(&mut self) {
        self.control.finished.store(true, Ordering::Release);
        if let Some(sender) = self.on_ended.take() {
            let _ = sender.send(SourceEvent::Ended(self.id));
        }
    }
}

impl Iterator for StemSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.control.stop.load(Ordering::Acquire) {
            // Stopped sources go quiet without reporting completion.
            self.on_ended = None;
            self.control.finished.store(true, Ordering::Release);
            return None;
        }

        let Some(sample) = self.buffer.samples().get(self.position).copied() else {
            self.finish();
            return None;
        };
        self.position += 1;

        if !self.node.connected.load(Ordering::Relaxed) {
            return Some(0.0);
        }
        Some(sample * self.node.gain.load() * self.master.load())
    }
}

impl Source for StemSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.buffer.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        let remaining = self.buffer.samples().len().saturating_sub(self.position);
        let frames = remaining / self.buffer.channels() as usize;
        Some(Duration::from_secs_f64(
            frames as f64 / self.buffer.sample_rate() as f64,
        ))
    }
}

/// Mixer graph that plays through the system's default output device.
pub struct RodioMixer {
    _stream: OutputStream,
    mixer: rodio::mixer::Mixer,
    master: Arc<AtomicGain>,
    nodes: HashMap<GainNodeId, Arc<GainCell>>,
    sources: HashMap<SourceId, Arc<SourceControl>>,
    next_node: u64,
}

impl RodioMixer {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, MixerError> {
        let stream = open_output_stream_with_retry()?;
        let mixer = stream.mixer().clone();
        Ok(Self {
            _stream: stream,
            mixer,
            master: Arc::new(AtomicGain::new(1.0)),
            nodes: HashMap::new(),
            sources: HashMap::new(),
            next_node: 0,
        })
    }

    /// Forget controls of sources the audio thread has finished with.
    fn prune_finished(&mut self) {
        self.sources
            .retain(|_, control| !control.finished.load(Ordering::Acquire));
    }
}

impl MixerBackend for RodioMixer {
    fn create_gain_node(&mut self) -> GainNodeId {
        let id = GainNodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Arc::new(GainCell {
                gain: AtomicGain::new(1.0),
                connected: AtomicBool::new(false),
            }),
        );
        id
    }

    fn connect(&mut self, node: GainNodeId) -> Result<(), MixerError> {
        let cell = self.nodes.get(&node).ok_or(MixerError::UnknownNode(node))?;
        cell.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn disconnect(&mut self, node: GainNodeId) -> Result<(), MixerError> {
        match self.nodes.remove(&node) {
            Some(cell) => {
                cell.connected.store(false, Ordering::Relaxed);
                Ok(())
            }
            None => Err(MixerError::AlreadyDisconnected(node)),
        }
    }

    fn set_gain_at(&mut self, node: GainNodeId, gain: f32, _at: f64) -> Result<(), MixerError> {
        // Sources read the cell per sample, so the new value applies on the
        // next rendered sample.
        let cell = self.nodes.get(&node).ok_or(MixerError::UnknownNode(node))?;
        cell.gain.store(gain);
        Ok(())
    }

    fn gain(&self, node: GainNodeId) -> Option<f32> {
        self.nodes.get(&node).map(|cell| cell.gain.load())
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.master.store(gain);
    }

    fn master_gain(&self) -> f32 {
        self.master.load()
    }

    fn start_source(&mut self, request: SourceRequest) -> Result<(), MixerError> {
        self.prune_finished();

        let node = self
            .nodes
            .get(&request.destination)
            .cloned()
            .ok_or(MixerError::UnknownNode(request.destination))?;
        let control = Arc::new(SourceControl::default());
        let position = request.buffer.sample_index_at(request.offset);

        let source = StemSource {
            id: request.id,
            buffer: request.buffer,
            position,
            node,
            master: self.master.clone(),
            control: control.clone(),
            on_ended: Some(request.on_ended),
        };

        self.sources.insert(request.id, control);
        self.mixer.add(source);
        debug!("started source {} at sample {}", request.id, position);
        Ok(())
    }

    fn stop_source(&mut self, id: SourceId) -> Result<(), MixerError> {
        match self.sources.remove(&id) {
            Some(control) if !control.finished.load(Ordering::Acquire) => {
                control.stop.store(true, Ordering::Release);
                Ok(())
            }
            _ => Err(MixerError::AlreadyStopped(id)),
        }
    }
}

/// Open the default output stream with bounded retry behavior.
fn open_output_stream_with_retry() -> Result<OutputStream, MixerError> {
    let mut last_error = String::new();
    for attempt in 1..=OUTPUT_STREAM_OPEN_RETRIES {
        match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                last_error = err.to_string();
                if attempt < OUTPUT_STREAM_OPEN_RETRIES {
                    warn!(
                        "open_default_stream attempt {}/{} failed: {}",
                        attempt, OUTPUT_STREAM_OPEN_RETRIES, err
                    );
                    thread::sleep(Duration::from_millis(OUTPUT_STREAM_OPEN_RETRY_MS));
                }
            }
        }
    }
    error!(
        "failed to open default output stream after {} attempts: {}",
        OUTPUT_STREAM_OPEN_RETRIES, last_error
    );
    Err(MixerError::Output(last_error))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn source(samples: Vec<f32>) -> (StemSource, mpsc::Receiver<SourceEvent>) {
        let (sender, receiver) = mpsc::channel();
        let source = StemSource {
            id: SourceId(7),
            buffer: Arc::new(StemBuffer::from_interleaved(samples, 1, 10)),
            position: 0,
            node: Arc::new(GainCell {
                gain: AtomicGain::new(0.5),
                connected: AtomicBool::new(true),
            }),
            master: Arc::new(AtomicGain::new(1.0)),
            control: Arc::new(SourceControl::default()),
            on_ended: Some(sender),
        };
        (source, receiver)
    }

    #[test]
    fn source_scales_by_node_gain_and_reports_end_once() {
        let (mut source, receiver) = source(vec![1.0, -1.0]);
        assert_eq!(source.next(), Some(0.5));
        assert_eq!(source.next(), Some(-0.5));
        assert_eq!(source.next(), None);
        assert_eq!(source.next(), None);
        assert_eq!(receiver.try_recv(), Ok(SourceEvent::Ended(SourceId(7))));
        assert!(receiver.try_recv().is_err());
        assert!(source.control.finished.load(Ordering::Acquire));
    }

    #[test]
    fn stopped_source_is_silent_and_reports_nothing() {
        let (mut source, receiver) = source(vec![1.0; 4]);
        assert_eq!(source.next(), Some(0.5));
        source.control.stop.store(true, Ordering::Release);
        assert_eq!(source.next(), None);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn disconnected_node_outputs_silence() {
        let (mut source, _receiver) = source(vec![1.0; 2]);
        source.node.connected.store(false, Ordering::Relaxed);
        assert_eq!(source.next(), Some(0.0));
    }
}
