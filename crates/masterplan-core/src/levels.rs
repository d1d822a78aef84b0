//! Level registry: level id -> level metadata. Reads of unknown ids return `None`.

use crate::model::{Level, MASTER_LEVEL_ID};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelRegistry {
    levels: BTreeMap<String, Level>,
}

impl LevelRegistry {
    /// Registry holding only the root level.
    pub fn new(root_name: &str) -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(
            MASTER_LEVEL_ID.to_string(),
            Level::new(MASTER_LEVEL_ID, root_name),
        );
        Self { levels }
    }

    /// Rebuilds from a persisted map. Keys win over the embedded ids; the root is re-added if
    /// missing.
    pub fn from_persisted(levels: BTreeMap<String, Level>, root_name: &str) -> Self {
        let mut levels: BTreeMap<String, Level> = levels
            .into_iter()
            .map(|(id, mut level)| {
                level.id = id.clone();
                (id, level)
            })
            .collect();
        levels
            .entry(MASTER_LEVEL_ID.to_string())
            .or_insert_with(|| Level::new(MASTER_LEVEL_ID, root_name));
        Self { levels }
    }

    pub fn get(&self, id: &str) -> Option<&Level> {
        self.levels.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.levels.contains_key(id)
    }

    /// Sets or replaces the image, creating an unnamed level if `id` is unknown.
    pub fn upsert_image(&mut self, id: &str, image: impl Into<String>) {
        let level = self
            .levels
            .entry(id.to_string())
            .or_insert_with(|| Level::new(id, ""));
        level.image_url = Some(image.into());
    }

    /// Drops the image but keeps the level. Returns whether the level exists.
    /// Pin cascade is the caller's job (see [`crate::PinRegistry::remove_all_for_level`]).
    pub fn clear_image(&mut self, id: &str) -> bool {
        match self.levels.get_mut(id) {
            Some(level) => {
                level.image_url = None;
                true
            }
            None => false,
        }
    }

    /// Returns the level, creating a stub `{id, name}` without image when absent.
    pub fn ensure(&mut self, id: &str, default_name: &str) -> &Level {
        self.levels
            .entry(id.to_string())
            .or_insert_with(|| Level::new(id, default_name))
    }

    /// Records `parent` as the container of `id` unless a parent is already known or the link
    /// would close a cycle.
    pub fn link_parent(&mut self, id: &str, parent: &str) {
        if id == parent || id == MASTER_LEVEL_ID || self.is_ancestor(id, parent) {
            return;
        }
        if let Some(level) = self.levels.get_mut(id) {
            if level.parent_level_id.is_none() {
                level.parent_level_id = Some(parent.to_string());
            }
        }
    }

    /// True when `ancestor` appears on the parent chain above `id`.
    fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut cursor = self.get(id).and_then(|l| l.parent_level_id.as_deref());
        let mut steps = 0;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.levels.len() {
                break;
            }
            cursor = self.get(parent).and_then(|l| l.parent_level_id.as_deref());
        }
        false
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> bool {
        match self.levels.get_mut(id) {
            Some(level) => {
                level.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Number of parent links from `id` up to a level without parent. Cycles stop the walk.
    pub fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut cursor = self.get(id).and_then(|l| l.parent_level_id.as_deref());
        while let Some(parent) = cursor {
            depth += 1;
            if depth > self.levels.len() {
                tracing::warn!(target: "masterplan::levels", level_id = id, "Parent chain has a cycle");
                break;
            }
            cursor = self.get(parent).and_then(|l| l.parent_level_id.as_deref());
        }
        depth
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Level> {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_reads_as_absent() {
        let reg = LevelRegistry::new("Master Plan");
        assert!(reg.get("nope").is_none());
        assert_eq!(reg.get(MASTER_LEVEL_ID).unwrap().name, "Master Plan");
    }

    #[test]
    fn upsert_creates_unnamed_level() {
        let mut reg = LevelRegistry::new("Master Plan");
        reg.upsert_image("dist-1", "images/B1.jpg");
        let level = reg.get("dist-1").unwrap();
        assert_eq!(level.name, "");
        assert_eq!(level.image_url.as_deref(), Some("images/B1.jpg"));

        reg.upsert_image("dist-1", "images/B2.jpg");
        assert_eq!(reg.get("dist-1").unwrap().image_url.as_deref(), Some("images/B2.jpg"));
    }

    #[test]
    fn clear_image_keeps_level() {
        let mut reg = LevelRegistry::new("Master Plan");
        reg.upsert_image(MASTER_LEVEL_ID, "images/MasterPlan.jpg");
        assert!(reg.clear_image(MASTER_LEVEL_ID));
        assert!(!reg.get(MASTER_LEVEL_ID).unwrap().has_image());
        assert!(!reg.clear_image("ghost"));
        assert!(reg.get("ghost").is_none());
    }

    #[test]
    fn ensure_keeps_existing_name() {
        let mut reg = LevelRegistry::new("Master Plan");
        assert_eq!(reg.ensure("dist-1", "District 1").name, "District 1");
        assert_eq!(reg.ensure("dist-1", "Other").name, "District 1");
        assert!(reg.get("dist-1").unwrap().image_url.is_none());
    }

    #[test]
    fn depth_follows_parents_and_survives_cycles() {
        let mut reg = LevelRegistry::new("Master Plan");
        reg.ensure("a", "A");
        reg.ensure("b", "B");
        reg.link_parent("a", MASTER_LEVEL_ID);
        reg.link_parent("b", "a");
        assert_eq!(reg.depth(MASTER_LEVEL_ID), 0);
        assert_eq!(reg.depth("b"), 2);

        reg.link_parent(MASTER_LEVEL_ID, "b");
        reg.link_parent("a", "b");
        assert_eq!(reg.get("a").unwrap().parent_level_id.as_deref(), Some(MASTER_LEVEL_ID));

        let mut x = Level::new("x", "X");
        x.parent_level_id = Some("y".into());
        let mut y = Level::new("y", "Y");
        y.parent_level_id = Some("x".into());
        let map = BTreeMap::from([("x".to_string(), x), ("y".to_string(), y)]);
        let looped = LevelRegistry::from_persisted(map, "Master Plan");
        assert!(looped.depth("x") <= looped.len() + 1);
    }

    #[test]
    fn link_parent_fills_missing_parent_only_once() {
        let mut reg = LevelRegistry::new("Master Plan");
        reg.upsert_image("dist-1", "images/B1.jpg");
        reg.ensure("bldg-31", "Building 31");
        reg.link_parent("dist-1", MASTER_LEVEL_ID);
        reg.link_parent("bldg-31", "dist-1");
        reg.link_parent("dist-1", "bldg-31");
        assert_eq!(reg.get("dist-1").unwrap().parent_level_id.as_deref(), Some(MASTER_LEVEL_ID));
        assert_eq!(reg.depth("bldg-31"), 2);
    }

    #[test]
    fn persisted_map_regains_root() {
        let mut map = BTreeMap::new();
        map.insert("dist-1".to_string(), Level::new("wrong", "District"));
        let reg = LevelRegistry::from_persisted(map, "Site");
        assert_eq!(reg.get("dist-1").unwrap().id, "dist-1");
        assert_eq!(reg.get(MASTER_LEVEL_ID).unwrap().name, "Site");
    }
}
