//! Deterministic in-memory mixer graph.
//!
//! `VirtualMixer` produces no sound. It tracks node gains, connections and
//! source lifetimes against a [`Clock`], which makes it suitable for tests
//! and for headless hosts that only need transport timing.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::error::MixerError;
use crate::tools::clock::Clock;

use super::{GainNodeId, MixerBackend, SourceEvent, SourceId, SourceRequest};

/// Lifecycle of a virtual source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualSourceState {
    Playing,
    Stopped,
    Ended,
}

#[derive(Debug, Clone)]
struct VirtualNode {
    gain: f32,
    connected: bool,
    gain_changes: Vec<(f64, f32)>,
}

#[derive(Debug)]
struct VirtualSource {
    destination: GainNodeId,
    offset: f64,
    started_at: f64,
    remaining: f64,
    state: VirtualSourceState,
    on_ended: Sender<SourceEvent>,
}

#[derive(Debug)]
struct VirtualGraph {
    nodes: BTreeMap<GainNodeId, VirtualNode>,
    sources: BTreeMap<SourceId, VirtualSource>,
    master_gain: f32,
    next_node: u64,
}

/// Shared handle to a virtual graph. Clones observe the same graph.
#[derive(Clone)]
pub struct VirtualMixer {
    graph: Arc<Mutex<VirtualGraph>>,
    clock: Arc<dyn Clock>,
}

impl VirtualMixer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            graph: Arc::new(Mutex::new(VirtualGraph {
                nodes: BTreeMap::new(),
                sources: BTreeMap::new(),
                master_gain: 1.0,
                next_node: 0,
            })),
            clock,
        }
    }

    /// End every playing source whose buffer has run out by the clock's
    /// current reading, sending its completion event.
    ///
    /// # Returns
    ///
    /// Number of sources that ended.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let mut graph = self.graph.lock().unwrap();
        let mut ended = 0;
        for (id, source) in graph.sources.iter_mut() {
            if source.state != VirtualSourceState::Playing {
                continue;
            }
            if source.started_at + source.remaining <= now + 1e-9 {
                source.state = VirtualSourceState::Ended;
                let _ = source.on_ended.send(SourceEvent::Ended(*id));
                trace!("virtual source {} ended at {:.3}", id, now);
                ended += 1;
            }
        }
        ended
    }

    /// Force a playing source to end now, as if its buffer ran out.
    pub fn end_source(&self, id: SourceId) -> bool {
        let mut graph = self.graph.lock().unwrap();
        match graph.sources.get_mut(&id) {
            Some(source) if source.state == VirtualSourceState::Playing => {
                source.state = VirtualSourceState::Ended;
                let _ = source.on_ended.send(SourceEvent::Ended(id));
                true
            }
            _ => false,
        }
    }

    pub fn is_connected(&self, node: GainNodeId) -> bool {
        let graph = self.graph.lock().unwrap();
        graph.nodes.get(&node).map(|n| n.connected).unwrap_or(false)
    }

    pub fn connected_node_count(&self) -> usize {
        let graph = self.graph.lock().unwrap();
        graph.nodes.values().filter(|n| n.connected).count()
    }

    /// Every `(clock time, gain)` applied to `node`, in order.
    pub fn gain_history(&self, node: GainNodeId) -> Vec<(f64, f32)> {
        let graph = self.graph.lock().unwrap();
        graph
            .nodes
            .get(&node)
            .map(|n| n.gain_changes.clone())
            .unwrap_or_default()
    }

    /// Ids of sources that are currently playing.
    pub fn playing_sources(&self) -> Vec<SourceId> {
        let graph = self.graph.lock().unwrap();
        graph
            .sources
            .iter()
            .filter(|(_, s)| s.state == VirtualSourceState::Playing)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn source_state(&self, id: SourceId) -> Option<VirtualSourceState> {
        let graph = self.graph.lock().unwrap();
        graph.sources.get(&id).map(|s| s.state)
    }

    /// Buffer offset (seconds) a source was started at.
    pub fn source_offset(&self, id: SourceId) -> Option<f64> {
        let graph = self.graph.lock().unwrap();
        graph.sources.get(&id).map(|s| s.offset)
    }

    pub fn source_destination(&self, id: SourceId) -> Option<GainNodeId> {
        let graph = self.graph.lock().unwrap();
        graph.sources.get(&id).map(|s| s.destination)
    }

    /// Total number of sources ever started.
    pub fn started_source_count(&self) -> usize {
        self.graph.lock().unwrap().sources.len()
    }
}

impl MixerBackend for VirtualMixer {
    fn create_gain_node(&mut self) -> GainNodeId {
        let mut graph = self.graph.lock().unwrap();
        let id = GainNodeId(graph.next_node);
        graph.next_node += 1;
        graph.nodes.insert(
            id,
            VirtualNode {
                gain: 1.0,
                connected: false,
                gain_changes: Vec::new(),
            },
        );
        id
    }

    fn connect(&mut self, node: GainNodeId) -> Result<(), MixerError> {
        let mut graph = self.graph.lock().unwrap();
        let node_state = graph
            .nodes
            .get_mut(&node)
            .ok_or(MixerError::UnknownNode(node))?;
        node_state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self, node: GainNodeId) -> Result<(), MixerError> {
        let mut graph = self.graph.lock().unwrap();
        match graph.nodes.get_mut(&node) {
            Some(node_state) if node_state.connected => {
                node_state.connected = false;
                Ok(())
            }
            _ => Err(MixerError::AlreadyDisconnected(node)),
        }
    }

    fn set_gain_at(&mut self, node: GainNodeId, gain: f32, at: f64) -> Result<(), MixerError> {
        let mut graph = self.graph.lock().unwrap();
        let node_state = graph
            .nodes
            .get_mut(&node)
            .ok_or(MixerError::UnknownNode(node))?;
        node_state.gain = gain;
        node_state.gain_changes.push((at, gain));
        Ok(())
    }

    fn gain(&self, node: GainNodeId) -> Option<f32> {
        let graph = self.graph.lock().unwrap();
        graph.nodes.get(&node).map(|n| n.gain)
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.graph.lock().unwrap().master_gain = gain;
    }

    fn master_gain(&self) -> f32 {
        self.graph.lock().unwrap().master_gain
    }

    fn start_source(&mut self, request: SourceRequest) -> Result<(), MixerError> {
        let now = self.clock.now();
        let mut graph = self.graph.lock().unwrap();
        if !graph.nodes.contains_key(&request.destination) {
            return Err(MixerError::UnknownNode(request.destination));
        }
        graph.sources.insert(
            request.id,
            VirtualSource {
                destination: request.destination,
                offset: request.offset,
                started_at: now,
                remaining: request.buffer.remaining_after(request.offset),
                state: VirtualSourceState::Playing,
                on_ended: request.on_ended,
            },
        );
        Ok(())
    }

    fn stop_source(&mut self, id: SourceId) -> Result<(), MixerError> {
        let mut graph = self.graph.lock().unwrap();
        match graph.sources.get_mut(&id) {
            Some(source) if source.state == VirtualSourceState::Playing => {
                source.state = VirtualSourceState::Stopped;
                Ok(())
            }
            _ => Err(MixerError::AlreadyStopped(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::audio::StemBuffer;
    use crate::tools::clock::ManualClock;

    fn mixer() -> (VirtualMixer, ManualClock) {
        let clock = ManualClock::new();
        (VirtualMixer::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn disconnect_twice_is_benign() {
        let (mut mixer, _) = mixer();
        let node = mixer.create_gain_node();
        mixer.connect(node).unwrap();
        assert!(mixer.disconnect(node).is_ok());
        assert_eq!(
            mixer.disconnect(node),
            Err(MixerError::AlreadyDisconnected(node))
        );
    }

    #[test]
    fn source_ends_after_remaining_buffer() {
        let (mut mixer, clock) = mixer();
        let node = mixer.create_gain_node();
        let (sender, receiver) = mpsc::channel();
        mixer
            .start_source(SourceRequest {
                id: SourceId(1),
                buffer: Arc::new(StemBuffer::silence(1, 100, 10.0)),
                destination: node,
                offset: 4.0,
                on_ended: sender,
            })
            .unwrap();

        clock.advance(5.9);
        assert_eq!(mixer.tick(), 0);
        clock.advance(0.1);
        assert_eq!(mixer.tick(), 1);
        assert_eq!(receiver.try_recv(), Ok(SourceEvent::Ended(SourceId(1))));
        assert_eq!(
            mixer.stop_source(SourceId(1)),
            Err(MixerError::AlreadyStopped(SourceId(1)))
        );
    }

    #[test]
    fn stopped_source_never_reports_end() {
        let (mut mixer, clock) = mixer();
        let node = mixer.create_gain_node();
        let (sender, receiver) = mpsc::channel();
        mixer
            .start_source(SourceRequest {
                id: SourceId(2),
                buffer: Arc::new(StemBuffer::silence(1, 100, 1.0)),
                destination: node,
                offset: 0.0,
                on_ended: sender,
            })
            .unwrap();
        mixer.stop_source(SourceId(2)).unwrap();
        clock.advance(2.0);
        assert_eq!(mixer.tick(), 0);
        assert!(receiver.try_recv().is_err());
        assert_eq!(
            mixer.source_state(SourceId(2)),
            Some(VirtualSourceState::Stopped)
        );
    }

    #[test]
    fn gain_changes_are_recorded() {
        let (mut mixer, _) = mixer();
        let node = mixer.create_gain_node();
        assert_eq!(mixer.gain(node), Some(1.0));
        mixer.set_gain_at(node, 0.5, 1.0).unwrap();
        mixer.set_gain_at(node, 0.0, 2.0).unwrap();
        assert_eq!(mixer.gain(node), Some(0.0));
        assert_eq!(mixer.gain_history(node), vec![(1.0, 0.5), (2.0, 0.0)]);
        assert_eq!(
            mixer.set_gain_at(GainNodeId(99), 1.0, 0.0),
            Err(MixerError::UnknownNode(GainNodeId(99)))
        );
    }
}
