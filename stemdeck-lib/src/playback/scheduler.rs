//! Ownership of live per-stem playback sources.

use std::collections::HashMap;

use crate::graph::SourceId;

/// Active source set, at most one per stem.
///
/// Ids increase monotonically and are never reused, so a completion for a
/// source from an earlier play cycle can never match the current set.
#[derive(Debug, Default)]
pub struct SourceScheduler {
    next_id: u64,
    active: HashMap<SourceId, String>,
}

impl SourceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source for `stem` and return its id.
    pub fn allocate(&mut self, stem: &str) -> SourceId {
        self.next_id += 1;
        let id = SourceId(self.next_id);
        self.active.insert(id, stem.to_string());
        id
    }

    /// Remove a source from the active set.
    ///
    /// # Returns
    ///
    /// The stem it belonged to, or `None` for an unknown or stale id.
    pub fn remove(&mut self, id: SourceId) -> Option<String> {
        self.active.remove(&id)
    }

    /// The active source playing `stem`, if any.
    pub fn source_for(&self, stem: &str) -> Option<SourceId> {
        self.active
            .iter()
            .find(|(_, name)| name.as_str() == stem)
            .map(|(id, _)| *id)
    }

    /// Empty the active set, returning every id it held.
    pub fn drain(&mut self) -> Vec<SourceId> {
        self.active.drain().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut scheduler = SourceScheduler::new();
        let first = scheduler.allocate("drums");
        scheduler.drain();
        let second = scheduler.allocate("drums");
        assert_ne!(first, second);
        assert_eq!(scheduler.remove(first), None);
        assert_eq!(scheduler.remove(second).as_deref(), Some("drums"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn lookup_by_stem() {
        let mut scheduler = SourceScheduler::new();
        let drums = scheduler.allocate("drums");
        let bass = scheduler.allocate("bass");
        assert_eq!(scheduler.source_for("bass"), Some(bass));
        assert_eq!(scheduler.source_for("drums"), Some(drums));
        assert_eq!(scheduler.source_for("vocals"), None);
        assert_eq!(scheduler.len(), 2);
        let mut drained = scheduler.drain();
        drained.sort();
        assert_eq!(drained, vec![drums, bass]);
    }
}
