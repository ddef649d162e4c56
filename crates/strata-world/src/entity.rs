use hashbrown::HashMap;
use strata_geom::Location;

use crate::error::WorldError;

pub type ViewerId = u32;
pub type EntityId = u32;

#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    pub name: String,
    pub location: Location,
    /// Connection observing through this entity, if any.
    pub viewer: Option<ViewerId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ViewerState {
    /// Set once the initial world snapshot reached the viewer.
    loaded: bool,
}

/// Entities and viewers of one world, keyed by their own ids rather than by
/// network identity.
#[derive(Debug, Default)]
pub struct WorldEntitySet {
    entities: HashMap<EntityId, EntityRecord>,
    viewers: HashMap<ViewerId, ViewerState>,
}

impl WorldEntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, id: EntityId, rec: EntityRecord) -> Result<(), WorldError> {
        if self.entities.contains_key(&id) {
            return Err(WorldError::DuplicateEntity(id));
        }
        self.entities.insert(id, rec);
        Ok(())
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Result<EntityRecord, WorldError> {
        self.entities
            .remove(&id)
            .ok_or(WorldError::UnknownEntity(id))
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn set_location(&mut self, id: EntityId, loc: Location) -> Result<(), WorldError> {
        let rec = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        rec.location = loc;
        Ok(())
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns false when the viewer was already joined.
    pub fn join_viewer(&mut self, viewer: ViewerId) -> bool {
        if self.viewers.contains_key(&viewer) {
            return false;
        }
        self.viewers.insert(viewer, ViewerState::default());
        true
    }

    /// Leaving without having joined would take the count below zero.
    pub fn leave_viewer(&mut self, viewer: ViewerId) -> Result<(), WorldError> {
        self.viewers
            .remove(&viewer)
            .map(|_| ())
            .ok_or(WorldError::UnknownViewer(viewer))
    }

    pub fn mark_loaded(&mut self, viewer: ViewerId) -> Result<(), WorldError> {
        let st = self
            .viewers
            .get_mut(&viewer)
            .ok_or(WorldError::UnknownViewer(viewer))?;
        st.loaded = true;
        Ok(())
    }

    /// Every viewer goes back to waiting for a snapshot; returns them.
    pub fn mark_all_unloaded(&mut self) -> Vec<ViewerId> {
        for st in self.viewers.values_mut() {
            st.loaded = false;
        }
        self.viewer_ids()
    }

    pub fn viewer_ids(&self) -> Vec<ViewerId> {
        let mut ids: Vec<ViewerId> = self.viewers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn loaded_viewers(&self) -> Vec<ViewerId> {
        let mut ids: Vec<ViewerId> = self
            .viewers
            .iter()
            .filter(|(_, st)| st.loaded)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[inline]
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_twice_is_an_error() {
        let mut set = WorldEntitySet::new();
        assert!(set.join_viewer(3));
        assert!(!set.join_viewer(3));
        assert_eq!(set.viewer_count(), 1);
        assert_eq!(set.leave_viewer(3), Ok(()));
        assert_eq!(set.leave_viewer(3), Err(WorldError::UnknownViewer(3)));
        assert_eq!(set.viewer_count(), 0);
    }

    #[test]
    fn only_loaded_viewers_receive_updates() {
        let mut set = WorldEntitySet::new();
        set.join_viewer(1);
        set.join_viewer(2);
        set.mark_loaded(2).unwrap();
        assert_eq!(set.loaded_viewers(), vec![2]);
        assert_eq!(set.mark_all_unloaded(), vec![1, 2]);
        assert!(set.loaded_viewers().is_empty());
    }

    #[test]
    fn entity_lifecycle() {
        let mut set = WorldEntitySet::new();
        let rec = EntityRecord {
            name: "bob".into(),
            location: Location::default(),
            viewer: Some(1),
        };
        set.add_entity(7, rec.clone()).unwrap();
        assert_eq!(set.add_entity(7, rec), Err(WorldError::DuplicateEntity(7)));
        assert_eq!(set.remove_entity(7).unwrap().name, "bob");
        assert_eq!(set.remove_entity(7), Err(WorldError::UnknownEntity(7)));
    }
}
