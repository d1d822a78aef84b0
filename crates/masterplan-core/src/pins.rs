//! Pin registry: every pin of every level, in insertion order.

use crate::model::{Pin, PinPatch};

/// Outcome of [`PinRegistry::add`].
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Inserted,
    /// Another pin on the same level lies within the threshold.
    Duplicate { existing_id: String },
    /// A pin with this id is already stored.
    IdTaken,
}

impl AddOutcome {
    pub fn inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinRegistry {
    pins: Vec<Pin>,
    duplicate_threshold: f64,
}

impl PinRegistry {
    pub fn new(duplicate_threshold: f64) -> Self {
        Self::from_persisted(Vec::new(), duplicate_threshold)
    }

    pub fn from_persisted(pins: Vec<Pin>, duplicate_threshold: f64) -> Self {
        Self {
            pins,
            duplicate_threshold,
        }
    }

    /// Pin on `level_id` closer than the threshold to `(lat, lng)`, if any.
    pub fn find_near(&self, level_id: &str, lat: f64, lng: f64) -> Option<&Pin> {
        self.pins.iter().find(|p| {
            p.current_level_image == level_id && p.distance_to(lat, lng) < self.duplicate_threshold
        })
    }

    /// Appends `pin` unless it would stack on an existing marker or reuse an id.
    pub fn add(&mut self, pin: Pin) -> AddOutcome {
        if self.get(&pin.id).is_some() {
            tracing::warn!(target: "masterplan::pins", pin_id = %pin.id, "Pin id already present; add ignored");
            return AddOutcome::IdTaken;
        }
        if let Some(existing) = self.find_near(&pin.current_level_image, pin.lat, pin.lng) {
            tracing::debug!(
                target: "masterplan::pins",
                existing = %existing.id,
                level_id = %pin.current_level_image,
                "Pin already exists here"
            );
            return AddOutcome::Duplicate {
                existing_id: existing.id.clone(),
            };
        }
        self.pins.push(pin);
        AddOutcome::Inserted
    }

    pub fn remove(&mut self, id: &str) -> Option<Pin> {
        let idx = self.pins.iter().position(|p| p.id == id)?;
        Some(self.pins.remove(idx))
    }

    /// Merges `patch` into the pin with `id`. Returns false when absent.
    pub fn update(&mut self, id: &str, patch: PinPatch) -> bool {
        match self.pins.iter_mut().find(|p| p.id == id) {
            Some(pin) => {
                patch.apply(pin);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub fn list_for_level(&self, level_id: &str) -> Vec<Pin> {
        self.pins
            .iter()
            .filter(|p| p.current_level_image == level_id)
            .cloned()
            .collect()
    }

    /// Cascade delete for a level whose image was cleared. Returns the removed count.
    pub fn remove_all_for_level(&mut self, level_id: &str) -> usize {
        let before = self.pins.len();
        self.pins.retain(|p| p.current_level_image != level_id);
        before - self.pins.len()
    }

    pub fn all(&self) -> &[Pin] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(id: &str, level: &str, lat: f64, lng: f64) -> Pin {
        Pin::new(id, level, lat, lng, id.to_uppercase())
    }

    #[test]
    fn nearby_pin_on_same_level_is_rejected() {
        let mut reg = PinRegistry::new(15.0);
        assert!(reg.add(pin("a", "master", 100.0, 100.0)).inserted());
        assert_eq!(
            reg.add(pin("b", "master", 110.0, 105.0)),
            AddOutcome::Duplicate {
                existing_id: "a".into()
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn threshold_is_per_level_and_strict() {
        let mut reg = PinRegistry::new(15.0);
        assert!(reg.add(pin("a", "master", 100.0, 100.0)).inserted());
        assert!(reg.add(pin("b", "dist-1", 100.0, 100.0)).inserted());
        assert!(reg.add(pin("c", "master", 115.0, 100.0)).inserted());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn duplicate_id_is_ignored() {
        let mut reg = PinRegistry::new(15.0);
        reg.add(pin("a", "master", 0.0, 0.0));
        assert_eq!(reg.add(pin("a", "master", 500.0, 500.0)), AddOutcome::IdTaken);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut reg = PinRegistry::new(15.0);
        reg.add(pin("z", "master", 0.0, 0.0));
        reg.add(pin("x", "dist-1", 0.0, 0.0));
        reg.add(pin("a", "master", 300.0, 300.0));
        let ids: Vec<_> = reg.list_for_level("master").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["z", "a"]);
    }

    #[test]
    fn remove_and_update_unknown_are_noops() {
        let mut reg = PinRegistry::new(15.0);
        reg.add(pin("a", "master", 0.0, 0.0));
        assert!(reg.remove("ghost").is_none());
        assert!(!reg.update("ghost", PinPatch::default()));
        assert_eq!(reg.len(), 1);
        assert!(reg.remove("a").is_some());
        assert!(reg.is_empty());
    }

    #[test]
    fn cascade_only_touches_one_level() {
        let mut reg = PinRegistry::new(15.0);
        reg.add(pin("a", "dist-1", 0.0, 0.0));
        reg.add(pin("b", "dist-1", 200.0, 0.0));
        reg.add(pin("c", "master", 0.0, 0.0));
        assert_eq!(reg.remove_all_for_level("dist-1"), 2);
        assert_eq!(reg.all().len(), 1);
        assert_eq!(reg.all()[0].id, "c");
    }
}
