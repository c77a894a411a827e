//! Drift state engine.
//!
//! The engine owns the single [`State`] and is the only way to change it.
//! Every mutation runs to completion, then commits:
//!
//! ```text
//! validate -> mutate history + aggregates + counters -> notify observers -> persist snapshot
//! ```
//!
//! Rejected calls leave the state untouched and commit nothing. A failed
//! snapshot write is reported to the caller, but the in-memory mutation and
//! the observer notification have already happened and are kept.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = DriftEngine::open(&Config::load_or_default())?;
//! engine.add_minutes(30, "TikTok")?;
//! engine.replace_with_minutes("Gym", 20, 3)?;
//! assert_eq!(engine.state().minutes_today, 10);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result, ValidationError};
use crate::observer::{Observers, SubscriptionId};
use crate::simulation::MonthSimulator;
use crate::state::{date_key, Category, DailyAggregate, HistoryEntry, Source, State};
use crate::storage::{Config, KvStore, SqliteStore};

/// Default key the snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "drift";

/// Totals derived from the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub entries: usize,
    pub days_tracked: usize,
    pub doom_minutes: u64,
    pub good_minutes: u64,
    pub coins: u64,
    pub minutes_today: u64,
}

/// Owner of the tracked state.
pub struct DriftEngine {
    state: State,
    store: Option<Box<dyn KvStore>>,
    key: String,
    observers: Observers,
    clock: fn() -> DateTime<Utc>,
    seed: Option<u64>,
}

impl DriftEngine {
    /// Engine with default state and no backing store.
    pub fn in_memory() -> Self {
        Self {
            state: State::default(),
            store: None,
            key: SNAPSHOT_KEY.to_string(),
            observers: Observers::new(),
            clock: Utc::now,
            seed: None,
        }
    }

    /// Load the snapshot stored under `key`, or start from defaults if the
    /// key is absent or blank.
    ///
    /// # Errors
    /// Returns [`CoreError::Snapshot`] if the stored value does not parse as a
    /// state, and [`CoreError::Storage`] if the store cannot be read.
    pub fn load(store: Box<dyn KvStore>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let state = match store.get(&key)? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(|source| CoreError::Snapshot {
                    key: key.clone(),
                    source,
                })?
            }
            _ => {
                debug!(key = %key, "no snapshot stored, starting from defaults");
                State::default()
            }
        };
        debug!(
            key = %key,
            entries = state.history.len(),
            days = state.daily.len(),
            "snapshot loaded"
        );

        Ok(Self {
            state,
            store: Some(store),
            key,
            ..Self::in_memory()
        })
    }

    /// Open the engine the way `config` describes.
    ///
    /// Falls back to an in-memory engine, without error, when persistence is
    /// disabled or the snapshot database cannot be opened.
    ///
    /// # Errors
    /// Returns an error if the database opens but its snapshot is unreadable
    /// or malformed.
    pub fn open(config: &Config) -> Result<Self> {
        let seed = config.simulation.seed;
        if !config.storage.persist {
            info!("persistence disabled, running in memory");
            return Ok(Self::in_memory().with_seed(seed));
        }

        let opened = config
            .database_path()
            .and_then(|path| SqliteStore::open_at(path).map_err(CoreError::from));
        match opened {
            Ok(store) => Ok(Self::load(Box::new(store), config.storage.key.clone())?.with_seed(seed)),
            Err(e) => {
                warn!(error = %e, "persistent storage unavailable, running in memory");
                Ok(Self::in_memory().with_seed(seed))
            }
        }
    }

    /// Replace the time source used to decide what "today" is.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Fix the simulation seed. `None` draws from entropy on each run.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub fn snapshot_key(&self) -> &str {
        &self.key
    }

    /// Date-key of the current day.
    pub fn today_key(&self) -> String {
        date_key((self.clock)())
    }

    /// Today's aggregate, zero if nothing was logged yet.
    pub fn today(&self) -> DailyAggregate {
        self.state
            .daily
            .get(&self.today_key())
            .copied()
            .unwrap_or_default()
    }

    pub fn summary(&self) -> Summary {
        let (doom_minutes, good_minutes) =
            self.state
                .history
                .iter()
                .fold((0u64, 0u64), |(doom, good), e| match e.category {
                    Category::Doom => (doom + u64::from(e.minutes), good),
                    Category::Good => (doom, good + u64::from(e.minutes)),
                });
        Summary {
            entries: self.state.history.len(),
            days_tracked: self.state.daily.len(),
            doom_minutes,
            good_minutes,
            coins: self.state.coins,
            minutes_today: self.state.minutes_today,
        }
    }

    /// Per-day totals rebuilt from history, ignoring the cached aggregates.
    pub fn recompute_daily(&self) -> BTreeMap<String, DailyAggregate> {
        self.state.recompute_daily()
    }

    /// Date-keys where the cached aggregates disagree with history.
    pub fn check_consistency(&self) -> Vec<String> {
        self.state.inconsistent_days()
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Register a subscriber. It is called immediately with the current
    /// state, then after every committed mutation.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&State) + 'static,
    {
        self.observers.subscribe(&self.state, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Append an activity name to a category. Duplicates are allowed.
    pub fn add_activity_type(&mut self, category: Category, name: &str) -> Result<()> {
        validate_activity(name)?;
        self.state
            .activity_types
            .get_mut(category)
            .push(name.to_string());
        self.commit("add_activity_type")
    }

    /// Remove every occurrence of an activity name from a category.
    ///
    /// History entries naming the activity are left alone.
    pub fn remove_activity_type(&mut self, category: Category, name: &str) -> Result<()> {
        validate_activity(name)?;
        self.state
            .activity_types
            .get_mut(category)
            .retain(|n| n != name);
        self.commit("remove_activity_type")
    }

    /// Log a doom session today.
    pub fn add_minutes(&mut self, minutes: u32, activity: &str) -> Result<()> {
        validate_activity(activity)?;
        validate_minutes(minutes, activity)?;

        self.record_today(activity, Category::Doom, minutes, 0, Source::Button);
        self.state.minutes_today += u64::from(minutes);
        self.commit("add_minutes")
    }

    /// Log a good session today, redeeming doom minutes and granting coins.
    ///
    /// `minutes_today` is reduced by `minutes` but never below zero.
    pub fn replace_with_minutes(&mut self, activity: &str, minutes: u32, coins_gained: u32) -> Result<()> {
        validate_activity(activity)?;
        validate_minutes(minutes, activity)?;

        self.record_today(activity, Category::Good, minutes, coins_gained, Source::Drag);
        self.state.minutes_today = self.state.minutes_today.saturating_sub(u64::from(minutes));
        self.state.coins += u64::from(coins_gained);
        self.commit("replace_with_minutes")
    }

    /// Clear counters, history and aggregates. Activity types survive.
    pub fn reset_all(&mut self) -> Result<()> {
        self.state.minutes_today = 0;
        self.state.coins = 0;
        self.state.history.clear();
        self.state.daily.clear();
        self.commit("reset_all")
    }

    /// Replace history with a synthetic month, using the engine's seed.
    pub fn simulate_month(&mut self) -> Result<()> {
        self.simulate_month_with_seed(self.seed)
    }

    /// Replace history with a synthetic month ending today.
    ///
    /// Unlike the manual operations, `minutes_today` becomes today's net
    /// balance, `max(doom - good, 0)`, rather than a running counter.
    pub fn simulate_month_with_seed(&mut self, seed: Option<u64>) -> Result<()> {
        let month = MonthSimulator::new(seed).run((self.clock)(), &self.state.activity_types);
        self.state.history = month.history;
        self.state.daily = month.daily;
        self.state.coins = month.coins;
        self.state.minutes_today = month.minutes_today;
        self.commit("simulate_month")
    }

    /// Write the current snapshot to the store, if there is one.
    ///
    /// # Errors
    /// Returns an error if serialization or the store write fails.
    pub fn persist(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let raw = serde_json::to_string(&self.state)?;
        store.set(&self.key, &raw)?;
        Ok(())
    }

    fn record_today(
        &mut self,
        activity: &str,
        category: Category,
        minutes: u32,
        coins_delta: u32,
        source: Source,
    ) {
        let now = (self.clock)();
        let day_key = date_key(now);
        self.state.history.push(HistoryEntry::new(
            now,
            day_key.clone(),
            activity,
            category,
            minutes,
            coins_delta,
            source,
        ));
        self.state
            .daily
            .entry(day_key)
            .or_default()
            .add(category, minutes);
    }

    fn commit(&mut self, op: &'static str) -> Result<()> {
        self.observers.notify(&self.state);
        if let Err(e) = self.persist() {
            warn!(op, error = %e, "snapshot write failed, keeping in-memory state");
            return Err(e);
        }
        debug!(
            op,
            minutes_today = self.state.minutes_today,
            coins = self.state.coins,
            entries = self.state.history.len(),
            "committed"
        );
        Ok(())
    }
}

impl Default for DriftEngine {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for DriftEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftEngine")
            .field("key", &self.key)
            .field("persistent", &self.store.is_some())
            .field("observers", &self.observers)
            .field("state", &self.state)
            .finish()
    }
}

fn validate_activity(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BlankActivity);
    }
    Ok(())
}

fn validate_minutes(minutes: u32, activity: &str) -> Result<(), ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::ZeroMinutes {
            activity: activity.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap()
    }

    fn engine() -> DriftEngine {
        DriftEngine::in_memory().with_clock(fixed_now)
    }

    struct FailingStore;

    impl KvStore for FailingStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "quota exceeded".into(),
            })
        }
    }

    #[test]
    fn doom_then_good_scenario() {
        let mut engine = engine();
        engine.add_minutes(30, "TikTok").unwrap();
        engine.replace_with_minutes("Gym", 20, 3).unwrap();

        let state = engine.state();
        assert_eq!(state.minutes_today, 10);
        assert_eq!(state.coins, 3);
        assert_eq!(state.daily["2026-03-15"], DailyAggregate { doom: 30, good: 20 });
        assert_eq!(state.history.len(), 2);
        assert_eq!(engine.today(), DailyAggregate { doom: 30, good: 20 });
    }

    #[test]
    fn add_minutes_records_button_entry() {
        let mut engine = engine();
        engine.add_minutes(15, "Reddit").unwrap();

        let entry = &engine.state().history[0];
        assert_eq!(entry.category, Category::Doom);
        assert_eq!(entry.coins_delta, 0);
        assert_eq!(entry.source, Source::Button);
        assert_eq!(entry.date_key, "2026-03-15");
        assert_eq!(entry.timestamp, fixed_now().timestamp_millis());
    }

    #[test]
    fn good_minutes_floor_minutes_today_at_zero() {
        let mut engine = engine();
        engine.add_minutes(10, "TikTok").unwrap();
        engine.replace_with_minutes("Read", 45, 5).unwrap();

        assert_eq!(engine.state().minutes_today, 0);
        assert_eq!(engine.state().history[1].source, Source::Drag);
        assert_eq!(engine.today(), DailyAggregate { doom: 10, good: 45 });
    }

    #[test]
    fn rejected_input_leaves_state_untouched() {
        let mut engine = engine();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        engine.subscribe(move |_| *counter.borrow_mut() += 1);

        let err = engine.add_minutes(0, "TikTok").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::ZeroMinutes { .. })));
        let err = engine.replace_with_minutes("  ", 5, 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::BlankActivity)));
        assert!(engine.add_activity_type(Category::Good, "").is_err());

        assert_eq!(engine.state(), &State::default());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn observers_see_every_commit() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = engine.subscribe(move |s| sink.borrow_mut().push((s.history.len(), s.minutes_today)));

        engine.add_minutes(20, "YouTube").unwrap();
        engine.replace_with_minutes("Code", 5, 2).unwrap();
        assert!(engine.unsubscribe(id));
        engine.reset_all().unwrap();

        assert_eq!(*seen.borrow(), vec![(0, 0), (1, 20), (2, 15)]);
    }

    #[test]
    fn observers_never_see_stale_aggregates() {
        let mut engine = engine();
        let mismatches = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&mismatches);
        engine.subscribe(move |s| {
            if !s.inconsistent_days().is_empty() {
                *sink.borrow_mut() += 1;
            }
        });

        engine.add_minutes(20, "YouTube").unwrap();
        engine.replace_with_minutes("Code", 5, 2).unwrap();
        engine.simulate_month_with_seed(Some(4)).unwrap();
        engine.reset_all().unwrap();
        assert_eq!(*mismatches.borrow(), 0);
    }

    #[test]
    fn reset_keeps_activity_types() {
        let mut engine = engine();
        engine.add_activity_type(Category::Doom, "News").unwrap();
        engine.add_minutes(10, "News").unwrap();
        engine.replace_with_minutes("Gym", 30, 5).unwrap();
        let types = engine.state().activity_types.clone();

        engine.reset_all().unwrap();
        let state = engine.state();
        assert_eq!(state.minutes_today, 0);
        assert_eq!(state.coins, 0);
        assert!(state.history.is_empty());
        assert!(state.daily.is_empty());
        assert_eq!(state.activity_types, types);
    }

    #[test]
    fn activity_types_allow_duplicates_and_remove_all_occurrences() {
        let mut engine = engine();
        engine.add_activity_type(Category::Good, "Piano").unwrap();
        engine.add_activity_type(Category::Good, "Piano").unwrap();
        assert_eq!(
            engine.state().activity_types.good.iter().filter(|n| *n == "Piano").count(),
            2
        );

        engine.remove_activity_type(Category::Good, "Piano").unwrap();
        assert!(!engine.state().activity_types.good.contains(&"Piano".to_string()));
    }

    #[test]
    fn removing_activity_keeps_history() {
        let mut engine = engine();
        engine.add_minutes(10, "TikTok").unwrap();
        engine.remove_activity_type(Category::Doom, "TikTok").unwrap();
        assert_eq!(engine.state().history[0].activity, "TikTok");
        assert_eq!(engine.today().doom, 10);
    }

    #[test]
    fn simulate_month_uses_net_balance_for_minutes_today() {
        let mut engine = engine();
        engine.add_minutes(500, "TikTok").unwrap();
        engine.simulate_month_with_seed(Some(21)).unwrap();

        let state = engine.state();
        assert_eq!(state.daily.len(), 30);
        let today = state.daily["2026-03-15"];
        assert_eq!(state.minutes_today, today.doom.saturating_sub(today.good));
        let coins: u64 = state.history.iter().map(|e| u64::from(e.coins_delta)).sum();
        assert_eq!(state.coins, coins);
        assert!(state.history.iter().all(|e| e.source == Source::Sim));
    }

    #[test]
    fn engine_seed_makes_simulation_repeatable() {
        let mut a = engine().with_seed(Some(8));
        let mut b = engine().with_seed(Some(8));
        a.simulate_month().unwrap();
        b.simulate_month().unwrap();
        assert_eq!(a.state().daily, b.state().daily);
        assert_eq!(a.state().coins, b.state().coins);
    }

    #[test]
    fn every_commit_writes_snapshot() {
        let store = Rc::new(MemoryStore::new());
        let mut engine = DriftEngine::load(Box::new(Rc::clone(&store)), SNAPSHOT_KEY)
            .unwrap()
            .with_clock(fixed_now);
        assert!(store.is_empty());

        engine.add_minutes(25, "Instagram").unwrap();
        let raw = store.get(SNAPSHOT_KEY).unwrap().unwrap();
        let saved: State = serde_json::from_str(&raw).unwrap();
        assert_eq!(&saved, engine.state());
    }

    #[test]
    fn write_failure_is_reported_but_mutation_kept() {
        let mut engine = DriftEngine::load(Box::new(FailingStore), SNAPSHOT_KEY)
            .unwrap()
            .with_clock(fixed_now);
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        engine.subscribe(move |s| *sink.borrow_mut() = s.minutes_today);

        let err = engine.add_minutes(12, "TikTok").unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::WriteFailed { .. })));
        assert_eq!(engine.state().minutes_today, 12);
        assert_eq!(*seen.borrow(), 12);
    }

    #[test]
    fn malformed_snapshot_is_fatal() {
        let store = MemoryStore::with_value(SNAPSHOT_KEY, r#"{"coins": "lots"}"#);
        let err = DriftEngine::load(Box::new(store), SNAPSHOT_KEY).unwrap_err();
        assert!(matches!(err, CoreError::Snapshot { .. }));

        let store = MemoryStore::with_value(SNAPSHOT_KEY, "not json");
        assert!(DriftEngine::load(Box::new(store), SNAPSHOT_KEY).is_err());
    }

    #[test]
    fn blank_snapshot_loads_defaults() {
        let store = MemoryStore::with_value(SNAPSHOT_KEY, "   ");
        let engine = DriftEngine::load(Box::new(store), SNAPSHOT_KEY).unwrap();
        assert_eq!(engine.state(), &State::default());
        assert!(engine.is_persistent());
    }

    #[test]
    fn summary_totals_history() {
        let mut engine = engine();
        engine.add_minutes(30, "TikTok").unwrap();
        engine.add_minutes(10, "Reddit").unwrap();
        engine.replace_with_minutes("Gym", 20, 3).unwrap();

        let summary = engine.summary();
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.days_tracked, 1);
        assert_eq!(summary.doom_minutes, 40);
        assert_eq!(summary.good_minutes, 20);
        assert_eq!(summary.coins, 3);
        assert_eq!(summary.minutes_today, 20);
    }

    #[test]
    fn summary_serializes_with_camel_case_fields() {
        let mut engine = engine();
        engine.add_minutes(30, "TikTok").unwrap();

        let json = serde_json::to_value(engine.summary()).unwrap();
        assert_eq!(json["daysTracked"], 1);
        assert_eq!(json["doomMinutes"], 30);
        assert_eq!(json["goodMinutes"], 0);
        assert_eq!(json["minutesToday"], 30);
        assert!(json.get("days_tracked").is_none());
    }
}
