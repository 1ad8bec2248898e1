//! The synchronized multi-stem transport engine.
//!
//! `StemEngine` keeps one logical playback position shared by every loaded
//! stem. Each play cycle starts one fresh one-shot source per stem against
//! the same clock instant and buffer offset; pausing, seeking and stopping
//! discard those sources and never reposition them. Completion notifications
//! arrive on a channel and are applied by [`StemEngine::process_events`],
//! which every transport command runs first.

mod controls;
mod mixing;

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::audio::{StemBuffer, StemDecoder, SymphoniaDecoder};
use crate::error::EngineError;
use crate::graph::{GainNodeId, MixerBackend, RodioMixer, SourceEvent, SourceId, SourceRequest};
use crate::tools::clock::{Clock, SystemClock};

use super::mix::{MixState, Stem};
use super::scheduler::SourceScheduler;
use super::transport::Transport;

/// Point-in-time view of the transport for UI consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub time: f64,
    pub duration: f64,
    pub playing: bool,
}

/// Multi-stem player with shared transport and per-stem mixing.
pub struct StemEngine {
    mixer: Box<dyn MixerBackend>,
    clock: Arc<dyn Clock>,
    decoder: Arc<dyn StemDecoder>,
    mix: MixState,
    transport: Transport,
    scheduler: SourceScheduler,
    events: Sender<SourceEvent>,
    event_queue: Receiver<SourceEvent>,
}

impl StemEngine {
    /// Build an engine from explicit collaborators.
    ///
    /// # Arguments
    ///
    /// * `mixer` - Audio graph the engine routes stems through.
    /// * `clock` - Time basis for the transport position.
    /// * `decoder` - Used by the `load_stem*` family.
    pub fn new(
        mixer: Box<dyn MixerBackend>,
        clock: Arc<dyn Clock>,
        decoder: Arc<dyn StemDecoder>,
    ) -> Self {
        let (events, event_queue) = mpsc::channel();
        Self {
            mixer,
            clock,
            decoder,
            mix: MixState::new(),
            transport: Transport::new(),
            scheduler: SourceScheduler::new(),
            events,
            event_queue,
        }
    }

    /// Engine playing through the default output device with a wall clock
    /// and the Symphonia decoder.
    pub fn open_default() -> Result<Self, EngineError> {
        let mixer = RodioMixer::open_default()?;
        Ok(Self::new(
            Box::new(mixer),
            Arc::new(SystemClock::new()),
            Arc::new(SymphoniaDecoder::new()),
        ))
    }

    /// Shared handle to the engine's decoder, for use with
    /// [`spawn_decode`](crate::audio::spawn_decode).
    pub fn decoder(&self) -> Arc<dyn StemDecoder> {
        self.decoder.clone()
    }

    /// Decode `bytes` and register the result as stem `name`.
    ///
    /// A failed decode leaves the engine untouched.
    pub fn load_stem(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(), EngineError> {
        self.load_stem_with_hint(name, bytes, None)
    }

    /// Like [`load_stem`](Self::load_stem) with a file-extension probe hint.
    pub fn load_stem_with_hint(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        hint: Option<&str>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        let buffer = self.decoder.decode(bytes, hint).map_err(|err| {
            warn!("failed to decode stem {}: {}", name, err);
            err
        })?;
        self.insert_stem(name, buffer)
    }

    /// Read and decode a file as stem `name`.
    pub fn load_stem_file(
        &mut self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let hint = path.extension().and_then(|ext| ext.to_str());
        self.load_stem_with_hint(name, bytes, hint)
    }

    /// Register already-decoded audio as stem `name`.
    ///
    /// An existing stem with the same name is replaced and its mix settings
    /// reset. If the transport is playing, the new stem starts immediately at
    /// the current position.
    pub fn insert_stem(
        &mut self,
        name: impl Into<String>,
        buffer: StemBuffer,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.process_events();

        let node = self.mixer.create_gain_node();
        if let Err(err) = self.mixer.connect(node) {
            self.disconnect_node(node);
            return Err(err.into());
        }

        let mut solo_changed = false;
        if self.mix.contains(&name) {
            debug!("replacing stem {}", name);
            solo_changed = self.mix.soloed() == Some(name.as_str());
            self.remove_stem(&name);
        }

        let duration = buffer.duration();
        self.mix
            .insert(name.clone(), Stem::new(Arc::new(buffer), node));
        self.transport.set_duration(self.mix.duration());

        if solo_changed {
            self.apply_all_gains();
        } else {
            self.apply_gain(&name);
        }

        if self.transport.is_playing() {
            let position = self.current_time();
            self.spawn_source(&name, position);
        }

        info!(
            "loaded stem {} ({:.3}s), song duration {:.3}s",
            name,
            duration,
            self.transport.duration()
        );
        Ok(())
    }

    /// Remove stem `name`, releasing its node and any live source.
    ///
    /// If this leaves a playing transport with no sources, playback stops
    /// and rewinds as if the song had ended.
    pub fn unload_stem(&mut self, name: &str) -> Result<(), EngineError> {
        self.process_events();
        if !self.mix.contains(name) {
            return Err(EngineError::UnknownStem(name.to_string()));
        }

        let was_soloed = self.mix.soloed() == Some(name);
        self.remove_stem(name);
        if was_soloed {
            self.apply_all_gains();
        }

        if self.transport.is_playing() && self.scheduler.is_empty() {
            self.transport.rewind();
            info!("no stems left playing; transport stopped");
        }

        info!("unloaded stem {}", name);
        Ok(())
    }

    /// Tear down every stem and reset the transport to empty.
    pub fn clear(&mut self) {
        self.terminate_all_sources();
        for (name, stem) in self.mix.take_all() {
            trace!("releasing stem {}", name);
            self.disconnect_node(stem.node);
        }
        self.transport.reset();
        // Completions from the old song are meaningless now.
        while self.event_queue.try_recv().is_ok() {}
        info!("engine cleared");
    }

    /// Apply pending source completions.
    ///
    /// # Returns
    ///
    /// Number of notifications consumed.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.event_queue.try_recv() {
            match event {
                SourceEvent::Ended(id) => self.handle_source_ended(id),
            }
            handled += 1;
        }
        handled
    }

    pub fn has_stem(&self, name: &str) -> bool {
        self.mix.contains(name)
    }

    /// Loaded stem names in sorted order.
    pub fn stem_names(&self) -> Vec<String> {
        self.mix.names()
    }

    pub fn stem_count(&self) -> usize {
        self.mix.len()
    }

    /// Duration of one stem in seconds.
    pub fn stem_duration(&self, name: &str) -> Option<f64> {
        self.mix.get(name).map(Stem::duration)
    }

    /// Number of live playback sources.
    pub fn active_source_count(&self) -> usize {
        self.scheduler.len()
    }

    fn handle_source_ended(&mut self, id: SourceId) {
        let Some(stem) = self.scheduler.remove(id) else {
            trace!("ignoring completion of retired source {}", id);
            return;
        };
        debug!("stem {} reached its end", stem);

        if self.scheduler.is_empty() && self.transport.is_playing() {
            self.transport.rewind();
            info!("playback finished");
        }
    }

    /// Start a fresh source for `name` at `offset` seconds into its buffer.
    fn spawn_source(&mut self, name: &str, offset: f64) {
        let Some(stem) = self.mix.get(name) else {
            return;
        };
        let id = self.scheduler.allocate(name);
        let request = SourceRequest {
            id,
            buffer: stem.buffer.clone(),
            destination: stem.node,
            offset,
            on_ended: self.events.clone(),
        };
        if let Err(err) = self.mixer.start_source(request) {
            warn!("failed to start source for stem {}: {}", name, err);
            self.scheduler.remove(id);
        }
    }

    fn terminate_source(&mut self, id: SourceId) {
        self.scheduler.remove(id);
        match self.mixer.stop_source(id) {
            Ok(()) => {}
            Err(err) if err.is_benign() => trace!("{}", err),
            Err(err) => warn!("failed to stop source {}: {}", id, err),
        }
    }

    fn terminate_all_sources(&mut self) {
        for id in self.scheduler.drain() {
            self.terminate_source(id);
        }
    }

    fn disconnect_node(&mut self, node: GainNodeId) {
        match self.mixer.disconnect(node) {
            Ok(()) => {}
            Err(err) if err.is_benign() => trace!("{}", err),
            Err(err) => warn!("failed to disconnect gain node {}: {}", node, err),
        }
    }

    /// Drop a stem without touching transport state.
    fn remove_stem(&mut self, name: &str) {
        if let Some(id) = self.scheduler.source_for(name) {
            self.terminate_source(id);
        }
        if let Some(stem) = self.mix.remove(name) {
            self.disconnect_node(stem.node);
        }
        self.transport.set_duration(self.mix.duration());
    }
}
