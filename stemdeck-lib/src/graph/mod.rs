//! Mixer graph primitives.
//!
//! A graph has one master output and any number of gain nodes feeding it.
//! One-shot sources play a stem buffer into a gain node and report natural
//! completion on an `mpsc` channel. Backends must tolerate double stops and
//! double disconnects by returning the benign [`MixerError`] variants.

pub mod rodio_output;
pub mod virtual_graph;

use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::audio::StemBuffer;
use crate::error::MixerError;

pub use rodio_output::RodioMixer;
pub use virtual_graph::VirtualMixer;

/// Identifier of a gain node within one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GainNodeId(pub u64);

impl Display for GainNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a one-shot playback source. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Out-of-band notifications from sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// The source ran out of samples. Never sent for a stopped source.
    Ended(SourceId),
}

/// Everything needed to start one source.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub id: SourceId,
    pub buffer: Arc<StemBuffer>,
    pub destination: GainNodeId,
    /// Position inside the buffer, in seconds, where playback begins.
    pub offset: f64,
    pub on_ended: Sender<SourceEvent>,
}

/// Audio graph operations the transport engine relies on.
pub trait MixerBackend {
    /// Allocate a gain node with unity gain. The node is not yet connected.
    fn create_gain_node(&mut self) -> GainNodeId;

    /// Route `node` into the master output.
    fn connect(&mut self, node: GainNodeId) -> Result<(), MixerError>;

    /// Detach `node` from the master output and release it.
    fn disconnect(&mut self, node: GainNodeId) -> Result<(), MixerError>;

    /// Set the gain of `node` as of clock time `at`, without ramping.
    fn set_gain_at(&mut self, node: GainNodeId, gain: f32, at: f64) -> Result<(), MixerError>;

    /// Current gain of `node`, if it exists.
    fn gain(&self, node: GainNodeId) -> Option<f32>;

    fn set_master_gain(&mut self, gain: f32);

    fn master_gain(&self) -> f32;

    /// Create and immediately start a one-shot source.
    fn start_source(&mut self, request: SourceRequest) -> Result<(), MixerError>;

    /// Stop a source. Stopping twice, or after natural completion, reports
    /// [`MixerError::AlreadyStopped`].
    fn stop_source(&mut self, id: SourceId) -> Result<(), MixerError>;
}
