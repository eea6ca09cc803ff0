//! Revline Game Engine
//!
//! Platform-agnostic core logic for the Revline idle racing manager.
//! This crate provides the progression and race-simulation engine
//! without UI or platform-specific dependencies: catalog loading,
//! upgrade economics, race timing and save-state reconciliation.

pub mod actions;
pub mod attribute;
pub mod catalog;
pub mod data;
pub mod economy;
pub mod numbers;
pub mod race;
pub mod requirement;
pub mod save;
pub mod stars;
pub mod state;

// Re-export commonly used types
pub use actions::{Action, reduce};
pub use attribute::{AttrKind, Attribute, compute_attribute};
pub use catalog::{Catalog, CatalogCar, CatalogTrack, RaceEvent, Sponsor, UnlockRequirement};
pub use data::{CatalogData, RawCar, RawEvent, RawSponsor, RawTrack, parse_string_array};
pub use economy::{
    ExperienceTrackId, FACILITY_UPGRADES, FacilityUpgrade, SubSkill, attribute_upgrade_allowed,
    discount_value, required_upgrade,
};
pub use race::{
    PastRace, Race, RaceOutcome, RaceResult, RaceScoring, WeightedScoring,
};
pub use requirement::{Comparator, Requirement, meets_requirements, parse_requirement};
pub use save::{SAVE_THROTTLE_MS, SaveError, export_code, import_code, load_state};
pub use stars::{Star, new_attr_upgrade_stars, new_garage_slot_stars, new_stars_for_counter};
pub use state::{
    Experience, GameState, GarageCar, Locked, OfflineEarnings, PageNotifications,
    SCHEMA_VERSION, Toast, ToastKind, Tuning, Tutorial, Warnings,
};

/// Trait for abstracting save/load operations.
/// Platform-specific implementations should provide this.
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the persisted snapshot, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self) -> Result<Option<String>, Self::Error>;

    /// Persist a full snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, raw: &str) -> Result<(), Self::Error>;

    /// Delete the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be deleted.
    fn delete(&self) -> Result<(), Self::Error>;
}

/// The state-machine service owning a single save state. All commands
/// flow through [`GameEngine::dispatch`]; the caller supplies the wall
/// clock, the engine never reads time itself.
pub struct GameEngine<S, R = WeightedScoring>
where
    S: GameStorage,
    R: RaceScoring,
{
    catalog: Catalog,
    storage: S,
    scorer: R,
    state: GameState,
    last_save_ms: Option<u64>,
}

impl<S: GameStorage> GameEngine<S, WeightedScoring> {
    /// Create an engine with the default scorer and a fresh state.
    pub fn new(catalog: Catalog, storage: S, seed: u64) -> Self {
        Self::with_scorer(catalog, storage, WeightedScoring::new(seed))
    }

    /// Create an engine with the default scorer, restoring any persisted
    /// snapshot (stale or corrupt snapshots fall back to defaults with
    /// the reset warning set).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    pub fn load(catalog: Catalog, storage: S, seed: u64) -> Result<Self, anyhow::Error> {
        let mut engine = Self::new(catalog, storage, seed);
        if let Some(raw) = engine.storage.load().map_err(anyhow::Error::from)? {
            engine.state = save::load_state(&raw);
        }
        Ok(engine)
    }
}

impl<S, R> GameEngine<S, R>
where
    S: GameStorage,
    R: RaceScoring,
{
    /// Create an engine with an explicit scorer and a fresh state.
    pub fn with_scorer(catalog: Catalog, storage: S, scorer: R) -> Self {
        Self {
            catalog,
            storage,
            scorer,
            state: GameState::default(),
            last_save_ms: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Apply one command, then persist on the throttled cadence.
    /// Actions landing inside a throttle window are only written by a
    /// later dispatch; call [`GameEngine::flush`] before shutdown so
    /// the tail of a session is not lost.
    /// Concurrent dispatches must be serialized by the caller.
    pub fn dispatch(&mut self, action: &Action, now_ms: u64) {
        reduce(&mut self.state, &self.catalog, &self.scorer, action, now_ms);
        self.maybe_persist(now_ms);
    }

    /// Settle any races that came due by `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        self.dispatch(&Action::Tick, now_ms);
    }

    /// Persist if the throttle window has elapsed. Write failures are
    /// swallowed; gameplay continues on the in-memory state.
    fn maybe_persist(&mut self, now_ms: u64) {
        let due = self
            .last_save_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= SAVE_THROTTLE_MS);
        if due {
            self.flush(now_ms);
        }
    }

    /// Persist immediately, bypassing the throttle.
    pub fn flush(&mut self, now_ms: u64) {
        self.last_save_ms = Some(now_ms);
        match save::serialize_state(&self.state) {
            Ok(raw) => {
                if let Err(err) = self.storage.save(&raw) {
                    log::warn!("state write failed, continuing in memory: {err}");
                }
            }
            Err(err) => log::warn!("state serialize failed: {err}"),
        }
    }

    /// Wrap the current state in the base64 interchange format.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn export_save(&self) -> Result<String, SaveError> {
        save::export_code(&self.state)
    }

    /// Replace the state with an externally supplied save code. The
    /// current state is untouched when the code does not decode, parse
    /// or migrate.
    ///
    /// # Errors
    ///
    /// Returns the decode/parse/migration failure.
    pub fn import_save(&mut self, code: &str, now_ms: u64) -> Result<(), SaveError> {
        let loaded = save::import_code(code)?;
        self.dispatch(
            &Action::LoadState {
                state: Box::new(loaded),
            },
            now_ms,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::sample_catalog;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        slot: Rc<RefCell<Option<String>>>,
        writes: Rc<RefCell<u32>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn load(&self) -> Result<Option<String>, Self::Error> {
            Ok(self.slot.borrow().clone())
        }

        fn save(&self, raw: &str) -> Result<(), Self::Error> {
            *self.slot.borrow_mut() = Some(raw.to_string());
            *self.writes.borrow_mut() += 1;
            Ok(())
        }

        fn delete(&self) -> Result<(), Self::Error> {
            *self.slot.borrow_mut() = None;
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct BrokenDisk;

    struct BrokenStorage;

    impl GameStorage for BrokenStorage {
        type Error = BrokenDisk;

        fn load(&self) -> Result<Option<String>, Self::Error> {
            Ok(None)
        }

        fn save(&self, _raw: &str) -> Result<(), Self::Error> {
            Err(BrokenDisk)
        }

        fn delete(&self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn engine_persists_and_restores_state() {
        let storage = MemoryStorage::default();
        let mut engine = GameEngine::new(sample_catalog(), storage.clone(), 7);
        engine.dispatch(
            &Action::BuyCar {
                car_id: "swift".to_string(),
                color: None,
            },
            0,
        );
        assert_eq!(engine.state().garage_cars.len(), 1);

        let restored = GameEngine::load(sample_catalog(), storage, 7).unwrap();
        assert_eq!(restored.state().garage_cars.len(), 1);
        assert_eq!(restored.state().money, engine.state().money);
    }

    #[test]
    fn saves_are_throttled_per_window() {
        let storage = MemoryStorage::default();
        let mut engine = GameEngine::new(sample_catalog(), storage.clone(), 1);
        engine.tick(0);
        engine.tick(100);
        engine.tick(900);
        assert_eq!(*storage.writes.borrow(), 1);
        engine.tick(1_000);
        assert_eq!(*storage.writes.borrow(), 2);
        // The flushed snapshot always reflects the state at flush time.
        let raw = storage.slot.borrow().clone().unwrap();
        let persisted = save::load_state(&raw);
        assert_eq!(&persisted, engine.state());
    }

    #[test]
    fn flush_persists_actions_inside_the_throttle_window() {
        let storage = MemoryStorage::default();
        let mut engine = GameEngine::new(sample_catalog(), storage.clone(), 1);
        engine.tick(0);
        engine.dispatch(
            &Action::BuyCar {
                car_id: "swift".to_string(),
                color: None,
            },
            500,
        );
        // The purchase landed inside the window; the stored snapshot
        // is still the pre-purchase one.
        let raw = storage.slot.borrow().clone().unwrap();
        assert!(save::load_state(&raw).garage_cars.is_empty());

        engine.flush(500);
        let raw = storage.slot.borrow().clone().unwrap();
        assert_eq!(&save::load_state(&raw), engine.state());
    }

    #[test]
    fn write_failures_are_swallowed() {
        let mut engine = GameEngine::new(sample_catalog(), BrokenStorage, 1);
        engine.dispatch(
            &Action::BuyCar {
                car_id: "swift".to_string(),
                color: None,
            },
            0,
        );
        // Gameplay continues on the in-memory state.
        assert_eq!(engine.state().garage_cars.len(), 1);
    }

    #[test]
    fn export_import_round_trips_through_engine() {
        let mut engine = GameEngine::new(sample_catalog(), MemoryStorage::default(), 1);
        engine.dispatch(
            &Action::BuyCar {
                car_id: "swift".to_string(),
                color: Some("purple".to_string()),
            },
            0,
        );
        let code = engine.export_save().unwrap();

        let mut other = GameEngine::new(sample_catalog(), MemoryStorage::default(), 1);
        other.import_save(&code, 5_000).unwrap();
        assert_eq!(other.state(), engine.state());
    }

    #[test]
    fn failed_import_leaves_state_unchanged() {
        let mut engine = GameEngine::new(sample_catalog(), MemoryStorage::default(), 1);
        let before = engine.state().clone();
        assert!(engine.import_save("@@@", 0).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn stale_persisted_snapshot_resets_with_warning() {
        let storage = MemoryStorage::default();
        *storage.slot.borrow_mut() = Some(r#"{"version":1,"money":9}"#.to_string());
        let engine = GameEngine::load(sample_catalog(), storage, 1).unwrap();
        assert_eq!(engine.state().money, GameState::default().money);
        assert!(engine.state().warnings.store_reset);
    }
}
