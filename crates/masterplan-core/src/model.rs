//! Levels, pins and the pin-creation payloads handed over by dialog collaborators.
//!
//! Field names serialize in camelCase so persisted blobs keep the layout the browser build
//! wrote (`imageUrl`, `currentLevelImage`, `targetLevelImage`, ...).

use serde::{Deserialize, Serialize};

/// Reserved id of the root level.
pub const MASTER_LEVEL_ID: &str = "master";

/// Prefix of child levels created from a pin: `level-{pin id}`.
pub const CHILD_LEVEL_PREFIX: &str = "level-";

pub fn child_level_id(pin_id: &str) -> String {
    format!("{}{}", CHILD_LEVEL_PREFIX, pin_id)
}

/// One node of the map hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// Filled from the registry key on hydration; older blobs may omit it.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// URL or data-encoded raster. `None` means awaiting upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Level holding the pin that drills into this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_level_id: Option<String>,
}

impl Level {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: None,
            parent_level_id: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// A marker anchored to exactly one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub is_building: bool,
    pub lat: f64,
    pub lng: f64,
    /// Id of the level this pin is drawn on.
    pub current_level_image: String,
    /// Id of the level this pin drills into. Empty string is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_level_image: Option<String>,
}

impl Pin {
    /// Minimal pin on `level_id`; descriptive fields start empty.
    pub fn new(
        id: impl Into<String>,
        level_id: impl Into<String>,
        lat: f64,
        lng: f64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            block_number: None,
            region: None,
            is_building: false,
            lat,
            lng,
            current_level_image: level_id.into(),
            target_level_image: None,
        }
    }

    pub fn with_target(mut self, level_id: impl Into<String>) -> Self {
        self.target_level_image = Some(level_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Drill-down target, if this pin is a portal.
    pub fn portal_target(&self) -> Option<&str> {
        self.target_level_image.as_deref().filter(|t| !t.is_empty())
    }

    pub fn distance_to(&self, lat: f64, lng: f64) -> f64 {
        (self.lat - lat).hypot(self.lng - lng)
    }
}

/// Partial pin update returned by an edit dialog. `None` leaves a field unchanged.
/// Level and coordinates are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub is_building: Option<bool>,
    #[serde(default)]
    pub target_level_image: Option<String>,
}

impl PinPatch {
    pub fn apply(self, pin: &mut Pin) {
        if let Some(name) = self.name {
            pin.name = name;
        }
        if let Some(description) = self.description {
            pin.description = Some(description);
        }
        if let Some(block_number) = self.block_number {
            pin.block_number = Some(block_number);
        }
        if let Some(region) = self.region {
            pin.region = Some(region);
        }
        if let Some(is_building) = self.is_building {
            pin.is_building = is_building;
        }
        if let Some(target) = self.target_level_image {
            pin.target_level_image = Some(target);
        }
    }
}

/// Which dialog variant applies on the current level, by hierarchy depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStep {
    /// Master plan: pins mark regions.
    Region,
    /// One level down: sub-regions or buildings.
    District,
    /// Deepest configured level; pins never drill further.
    Unit,
}

impl PinStep {
    pub fn for_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Region,
            1 => Self::District,
            _ => Self::Unit,
        }
    }

    pub fn accepts(&self, draft: &PinDraft) -> bool {
        matches!(
            (self, draft),
            (Self::Region, PinDraft::Regional { .. })
                | (Self::District, PinDraft::Regional { .. })
                | (Self::District, PinDraft::Building { .. })
                | (Self::Unit, PinDraft::Simple { .. })
        )
    }

    /// Label for the name field; `building` only matters on [`PinStep::District`].
    pub fn name_label(&self, building: bool) -> &'static str {
        match (self, building) {
            (Self::Region, _) => "Region Name",
            (Self::District, true) => "Building Name",
            (Self::District, false) => "Sub Region Name",
            (Self::Unit, _) => "Unit Name",
        }
    }
}

/// Validated pin-creation payload. Coordinates come from the rendering surface separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PinDraft {
    /// Region or sub-region; an image turns the pin into a portal to a new child level.
    Regional {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        image: Option<String>,
    },
    Building {
        name: String,
        #[serde(default)]
        description: Option<String>,
        block_number: String,
    },
    Simple {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl PinDraft {
    pub fn name(&self) -> &str {
        match self {
            Self::Regional { name, .. } | Self::Building { name, .. } | Self::Simple { name, .. } => {
                name
            }
        }
    }

    /// Image payload for the child level, when this draft opens one.
    pub fn child_image(&self) -> Option<&str> {
        match self {
            Self::Regional { image, .. } => image.as_deref().filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Builds the pin for `level_id`. The target level is set only when a child image is present.
    pub fn into_pin(self, id: String, level_id: &str, lat: f64, lng: f64) -> Pin {
        let child = self.child_image().is_some().then(|| child_level_id(&id));
        match self {
            Self::Regional {
                name, description, ..
            } => Pin {
                description,
                target_level_image: child,
                ..Pin::new(id, level_id, lat, lng, name)
            },
            Self::Building {
                name,
                description,
                block_number,
            } => Pin {
                description,
                block_number: Some(block_number),
                is_building: true,
                ..Pin::new(id, level_id, lat, lng, name)
            },
            Self::Simple { name, description } => Pin {
                description,
                ..Pin::new(id, level_id, lat, lng, name)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_blob_keeps_browser_field_names() {
        let pin = Pin::new("p1", "dist-1", 10.0, 20.0, "Gate").with_target("level-p1");
        let v = serde_json::to_value(&pin).unwrap();
        assert_eq!(v["currentLevelImage"], "dist-1");
        assert_eq!(v["targetLevelImage"], "level-p1");
        assert_eq!(v["isBuilding"], false);
        assert!(v.get("description").is_none());
    }

    #[test]
    fn legacy_pin_with_empty_target_is_not_a_portal() {
        let raw = r#"{"id":"a","name":"Gate","blockNumber":"b11","description":"",
            "lat":1,"lng":2,"currentLevelImage":"master","targetLevelImage":""}"#;
        let pin: Pin = serde_json::from_str(raw).unwrap();
        assert_eq!(pin.block_number.as_deref(), Some("b11"));
        assert!(pin.portal_target().is_none());
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut pin = Pin::new("p1", "master", 1.0, 1.0, "Old").with_description("keep");
        PinPatch {
            name: Some("New".into()),
            is_building: Some(true),
            ..Default::default()
        }
        .apply(&mut pin);
        assert_eq!(pin.name, "New");
        assert_eq!(pin.description.as_deref(), Some("keep"));
        assert!(pin.is_building);
        assert_eq!(pin.current_level_image, "master");
    }

    #[test]
    fn steps_follow_depth() {
        assert_eq!(PinStep::for_depth(0), PinStep::Region);
        assert_eq!(PinStep::for_depth(1), PinStep::District);
        assert_eq!(PinStep::for_depth(7), PinStep::Unit);
        let building = PinDraft::Building {
            name: "B".into(),
            description: None,
            block_number: "b12".into(),
        };
        assert!(!PinStep::Region.accepts(&building));
        assert!(PinStep::District.accepts(&building));
        assert_eq!(PinStep::District.name_label(true), "Building Name");
    }

    #[test]
    fn regional_draft_with_image_becomes_portal() {
        let draft = PinDraft::Regional {
            name: "North".into(),
            description: None,
            image: Some("data:image/jpeg;base64,AAAA".into()),
        };
        let pin = draft.into_pin("abc".into(), "master", 5.0, 5.0);
        assert_eq!(pin.portal_target(), Some("level-abc"));

        let plain = PinDraft::Regional {
            name: "South".into(),
            description: None,
            image: Some(String::new()),
        };
        assert!(plain.into_pin("def".into(), "master", 1.0, 1.0).portal_target().is_none());
    }
}
