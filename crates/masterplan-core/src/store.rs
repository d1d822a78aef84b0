//! Master-plan store: levels, pins, navigation and admin mode behind one mutation API.
//!
//! Every mutator applies its change, commits one persistence batch covering levels, pins,
//! history and the current-level pointer, then publishes a fresh [`PlanSnapshot`]. Storage
//! faults are logged by the adapter and never reach the caller.

use crate::config::{ImageBounds, PlanConfig};
use crate::levels::LevelRegistry;
use crate::model::{child_level_id, Level, Pin, PinDraft, PinPatch, PinStep, MASTER_LEVEL_ID};
use crate::navigation::NavigationStack;
use crate::pins::PinRegistry;
use crate::storage::{
    Blob, KeyValueStore, PersistenceAdapter, CURRENT_LEVEL_KEY, LEVELS_KEY, NAV_HISTORY_KEY,
    PINS_KEY,
};
use std::collections::BTreeMap;
use tokio::sync::watch;
use uuid::Uuid;

/// Read-only view handed to rendering collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSnapshot {
    pub current_level: Level,
    pub current_level_pins: Vec<Pin>,
    pub history_len: usize,
    pub can_go_back: bool,
    pub admin_mode: bool,
    /// Delete markers are drawn exactly while admin mode is on.
    pub deletion_affordance_visible: bool,
    pub pin_step: PinStep,
}

pub struct MasterPlanStore {
    levels: LevelRegistry,
    pins: PinRegistry,
    navigation: NavigationStack,
    admin_mode: bool,
    bounds: ImageBounds,
    persistence: PersistenceAdapter,
    snapshot_tx: watch::Sender<PlanSnapshot>,
}

impl MasterPlanStore {
    /// Hydrates from `backend`. Each key falls back to its default independently.
    pub fn open(backend: impl KeyValueStore + 'static, config: &PlanConfig) -> Self {
        let persistence = PersistenceAdapter::new(backend, config.quota());

        let levels = match persistence.load::<BTreeMap<String, Level>>(LEVELS_KEY) {
            Some(map) => LevelRegistry::from_persisted(map, &config.root_level_name),
            None => LevelRegistry::new(&config.root_level_name),
        };
        let pins = PinRegistry::from_persisted(
            persistence.load::<Vec<Pin>>(PINS_KEY).unwrap_or_default(),
            config.duplicate_threshold,
        );
        let current = persistence
            .load_raw(CURRENT_LEVEL_KEY)
            .unwrap_or_else(|| MASTER_LEVEL_ID.to_string());
        let history = persistence
            .load::<Vec<String>>(NAV_HISTORY_KEY)
            .unwrap_or_default();

        let mut navigation = NavigationStack::from_persisted(current, history);
        if !levels.contains(navigation.current()) {
            tracing::warn!(
                target: "masterplan::store",
                level_id = navigation.current(),
                "Persisted current level is unknown; returning to master"
            );
            navigation.reset();
        }

        let store = Self {
            levels,
            pins,
            navigation,
            admin_mode: false,
            bounds: config.image_bounds(),
            persistence,
            snapshot_tx: watch::channel(Self::placeholder_snapshot()).0,
        };
        store.publish();

        tracing::info!(
            target: "masterplan::store",
            levels = store.levels.len(),
            pins = store.pins.len(),
            current = store.navigation.current(),
            history = store.navigation.len(),
            "Master plan hydrated"
        );
        store
    }

    fn placeholder_snapshot() -> PlanSnapshot {
        PlanSnapshot {
            current_level: Level::new(MASTER_LEVEL_ID, ""),
            current_level_pins: Vec::new(),
            history_len: 0,
            can_go_back: false,
            admin_mode: false,
            deletion_affordance_visible: false,
            pin_step: PinStep::Region,
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn current_level_id(&self) -> &str {
        self.navigation.current()
    }

    /// Current level; a stub named after the id if the registry lost it.
    pub fn current_level(&self) -> Level {
        let id = self.navigation.current();
        self.levels
            .get(id)
            .cloned()
            .unwrap_or_else(|| Level::new(id, id))
    }

    /// Always recomputed from the pin collection.
    pub fn current_level_pins(&self) -> Vec<Pin> {
        self.pins.list_for_level(self.navigation.current())
    }

    pub fn level(&self, id: &str) -> Option<&Level> {
        self.levels.get(id)
    }

    pub fn levels(&self) -> &LevelRegistry {
        &self.levels
    }

    pub fn pin(&self, id: &str) -> Option<&Pin> {
        self.pins.get(id)
    }

    pub fn pins(&self) -> &[Pin] {
        self.pins.all()
    }

    pub fn navigation_history(&self) -> &[String] {
        self.navigation.history()
    }

    pub fn can_go_back(&self) -> bool {
        self.navigation.can_go_back()
    }

    pub fn is_admin_mode(&self) -> bool {
        self.admin_mode
    }

    pub fn deletion_affordance_visible(&self) -> bool {
        self.admin_mode
    }

    pub fn image_bounds(&self) -> ImageBounds {
        self.bounds
    }

    /// Dialog variant for pins created on the current level.
    pub fn pin_step(&self) -> PinStep {
        PinStep::for_depth(self.levels.depth(self.navigation.current()))
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receives a new snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<PlanSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Admin mode is session state: it is published but never persisted.
    pub fn toggle_admin_mode(&mut self) {
        self.admin_mode = !self.admin_mode;
        tracing::info!(target: "masterplan::store", admin_mode = self.admin_mode, "Admin mode toggled");
        self.publish();
    }

    /// Customer-only views force admin mode off; nothing here turns it back on.
    pub fn enter_customer_view(&mut self) {
        if self.admin_mode {
            self.toggle_admin_mode();
        }
    }

    pub fn navigate_to_level(&mut self, level_id: &str, name: &str) {
        let leaving = self.navigation.current().to_string();
        let created = !self.levels.contains(level_id);
        self.levels.ensure(level_id, name);
        self.levels.link_parent(level_id, &leaving);
        self.navigation.forward(level_id);
        tracing::debug!(
            target: "masterplan::store",
            from = %leaving,
            to = level_id,
            created = created,
            "Navigated forward"
        );
        self.commit();
    }

    /// No-op (and no write) at the bottom of the history.
    pub fn go_back(&mut self) {
        if self.navigation.back().is_some() {
            self.commit();
        }
    }

    /// Appends a fully formed pin. Duplicates by proximity or id are dropped silently.
    pub fn add_pin(&mut self, pin: Pin) -> bool {
        let inserted = self.pins.add(pin).inserted();
        if inserted {
            self.commit();
        }
        inserted
    }

    pub fn update_pin(&mut self, id: &str, patch: PinPatch) {
        if self.pins.update(id, patch) {
            self.commit();
        }
    }

    pub fn remove_pin(&mut self, id: &str) {
        if self.pins.remove(id).is_some() {
            self.commit();
        }
    }

    pub fn update_level_image(&mut self, level_id: &str, image: &str) {
        self.levels.upsert_image(level_id, image);
        self.commit();
    }

    /// Clears the image and deletes every pin drawn on that level.
    pub fn remove_level_image(&mut self, level_id: &str) {
        let known = self.levels.clear_image(level_id);
        let removed = self.pins.remove_all_for_level(level_id);
        if !known && removed == 0 {
            tracing::debug!(target: "masterplan::store", level_id = level_id, "Unknown level; nothing to clear");
            return;
        }
        tracing::info!(
            target: "masterplan::store",
            level_id = level_id,
            removed_pins = removed,
            "Level image removed"
        );
        self.commit();
    }

    pub fn rename_level(&mut self, level_id: &str, name: &str) {
        if self.levels.rename(level_id, name) {
            self.commit();
        }
    }

    // ---------------------------------------------------------------------
    // Operator entry points
    // ---------------------------------------------------------------------

    /// Creates a pin from a dialog payload at a clicked position on the current level.
    ///
    /// Returns the new pin id, or `None` when admin mode is off, the draft does not fit the
    /// current [`PinStep`], the click lies outside the image, or a pin already sits there.
    /// A draft carrying an image also creates the child level in the same commit.
    pub fn create_pin(&mut self, draft: PinDraft, lat: f64, lng: f64) -> Option<String> {
        if !self.admin_mode {
            tracing::debug!(target: "masterplan::store", "Pin creation ignored outside admin mode");
            return None;
        }
        let step = self.pin_step();
        if !step.accepts(&draft) {
            tracing::warn!(target: "masterplan::store", step = ?step, "Pin draft does not fit this level");
            return None;
        }
        if !self.bounds.contains(lat, lng) {
            tracing::debug!(target: "masterplan::store", lat = lat, lng = lng, "Click outside image bounds");
            return None;
        }

        let current = self.navigation.current().to_string();
        let id = Uuid::new_v4().to_string();
        let child_image = draft.child_image().map(str::to_string);
        let pin = draft.into_pin(id.clone(), &current, lat, lng);
        let pin_name = pin.name.clone();

        if !self.pins.add(pin).inserted() {
            return None;
        }
        if let Some(image) = child_image {
            let child = child_level_id(&id);
            self.levels.ensure(&child, &pin_name);
            self.levels.link_parent(&child, &current);
            self.levels.upsert_image(&child, image);
        }
        tracing::info!(target: "masterplan::store", pin_id = %id, level_id = %current, "Pin created");
        self.commit();
        Some(id)
    }

    /// Delete affordance: only honoured in admin mode.
    pub fn delete_pin(&mut self, id: &str) -> bool {
        if !self.admin_mode || self.pins.get(id).is_none() {
            return false;
        }
        self.remove_pin(id);
        true
    }

    /// Pin click. Drills down when the pin sits on the current level and is a portal.
    pub fn activate_pin(&mut self, id: &str) -> bool {
        let Some(pin) = self.pins.get(id) else {
            return false;
        };
        if pin.current_level_image != self.navigation.current() {
            return false;
        }
        let Some(target) = pin.portal_target() else {
            return false;
        };
        let (target, name) = (target.to_string(), pin.name.clone());
        self.navigate_to_level(&target, &name);
        true
    }

    /// Explicit teardown hook: pushes buffered writes to disk.
    pub fn flush(&self) {
        self.persistence.flush();
    }

    // ---------------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------------

    /// One persistence pass over all durable state, then a snapshot publish.
    fn commit(&mut self) {
        let ok = self.persistence.commit(vec![
            (LEVELS_KEY, Blob::json(self.levels.as_map())),
            (CURRENT_LEVEL_KEY, Blob::raw(self.navigation.current())),
            (NAV_HISTORY_KEY, Blob::json(self.navigation.history())),
            (PINS_KEY, Blob::json(self.pins.all())),
        ]);
        if !ok {
            tracing::debug!(target: "masterplan::store", "Continuing with in-memory state only");
        }
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.build_snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    fn build_snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            current_level: self.current_level(),
            current_level_pins: self.current_level_pins(),
            history_len: self.navigation.len(),
            can_go_back: self.navigation.can_go_back(),
            admin_mode: self.admin_mode,
            deletion_affordance_visible: self.deletion_affordance_visible(),
            pin_step: self.pin_step(),
        }
    }
}
