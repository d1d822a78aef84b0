//! masterplan-core: drill-down site plans (master plan -> district -> building).
//!
//! Owns the level hierarchy, the pins anchored to each level, the back-navigation stack and
//! admin mode, and writes all durable state through to a key/value backend on every mutation.
//! Rendering, dialogs and image ingestion live outside this crate and talk to
//! [`MasterPlanStore`].

mod config;
mod error;
mod levels;
mod model;
mod navigation;
mod pins;
mod storage;
mod store;

pub use config::{
    ImageBounds, PlanConfig, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_QUOTA_BYTES,
    DEFAULT_ROOT_LEVEL_NAME,
};
pub use error::{PlanError, StorageError, StorageResult};
pub use levels::LevelRegistry;
pub use model::{
    child_level_id, Level, Pin, PinDraft, PinPatch, PinStep, CHILD_LEVEL_PREFIX, MASTER_LEVEL_ID,
};
pub use navigation::NavigationStack;
pub use pins::{AddOutcome, PinRegistry};
pub use storage::{
    Blob, KeyValueStore, MemoryStore, PersistenceAdapter, SledStore, CURRENT_LEVEL_KEY,
    LEVELS_KEY, NAV_HISTORY_KEY, PINS_KEY,
};
pub use store::{MasterPlanStore, PlanSnapshot};

/// Opens the Sled store at `config.storage_path` and hydrates a [`MasterPlanStore`] from it.
pub fn open_configured(config: &PlanConfig) -> Result<MasterPlanStore, PlanError> {
    let backend = SledStore::open_path(&config.storage_path)?;
    Ok(MasterPlanStore::open(backend, config))
}
