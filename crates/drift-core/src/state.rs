//! Tracked state: the root [`State`] record and the types it is made of.
//!
//! Field names serialize in camelCase so the persisted snapshot keeps the
//! `minutesToday` / `dateKey` / `coinsDelta` layout readers of the store expect.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default doom activities seeded into a fresh state.
pub const DEFAULT_DOOM_ACTIVITIES: [&str; 5] = ["TikTok", "Instagram", "YouTube", "Twitter", "Reddit"];

/// Default good activities seeded into a fresh state.
pub const DEFAULT_GOOD_ACTIVITIES: [&str; 5] = ["Read", "Gym", "Code", "Journal", "Music"];

/// Activity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Distracting time. Counts toward `minutes_today`, never earns coins.
    Doom,
    /// Constructive time. Redeems doom minutes and earns coins.
    Good,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Doom => "doom",
            Category::Good => "good",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doom" => Ok(Category::Doom),
            "good" => Ok(Category::Good),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// Where a history entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Manual doom log.
    Button,
    /// Manual good log.
    Drag,
    /// Synthetic entry from the month simulation.
    Sim,
}

/// One logged session. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Creation instant, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Logical day the entry is bucketed under (`YYYY-MM-DD`).
    pub date_key: String,
    pub activity: String,
    pub category: Category,
    pub minutes: u32,
    pub coins_delta: u32,
    pub source: Source,
}

impl HistoryEntry {
    /// Build an entry stamped with a fresh id and the given creation instant.
    pub fn new(
        at: DateTime<Utc>,
        date_key: impl Into<String>,
        activity: impl Into<String>,
        category: Category,
        minutes: u32,
        coins_delta: u32,
        source: Source,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: at.timestamp_millis(),
            date_key: date_key.into(),
            activity: activity.into(),
            category,
            minutes,
            coins_delta,
            source,
        }
    }
}

/// Minutes logged per category for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub doom: u64,
    pub good: u64,
}

impl DailyAggregate {
    pub fn add(&mut self, category: Category, minutes: u32) {
        match category {
            Category::Doom => self.doom += u64::from(minutes),
            Category::Good => self.good += u64::from(minutes),
        }
    }

    /// Doom minutes not covered by good minutes, floored at zero.
    pub fn net_doom(&self) -> u64 {
        self.doom.saturating_sub(self.good)
    }
}

/// User-configurable activity names per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTypes {
    #[serde(default)]
    pub doom: Vec<String>,
    #[serde(default)]
    pub good: Vec<String>,
}

impl ActivityTypes {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Doom => &self.doom,
            Category::Good => &self.good,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Doom => &mut self.doom,
            Category::Good => &mut self.good,
        }
    }
}

impl Default for ActivityTypes {
    fn default() -> Self {
        Self {
            doom: DEFAULT_DOOM_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
            good: DEFAULT_GOOD_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The complete tracked record. Serialized as-is into the snapshot.
///
/// Missing top-level fields fall back to their defaults, so an empty JSON
/// object loads as a fresh state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Running counter of unredeemed doom minutes.
    #[serde(default)]
    pub minutes_today: u64,
    #[serde(default)]
    pub coins: u64,
    /// Append-only, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Cached per-day totals, kept in step with `history` on every write.
    #[serde(default)]
    pub daily: BTreeMap<String, DailyAggregate>,
    #[serde(default)]
    pub activity_types: ActivityTypes,
}

impl State {
    /// Rebuild per-day totals from `history` alone.
    pub fn recompute_daily(&self) -> BTreeMap<String, DailyAggregate> {
        let mut daily: BTreeMap<String, DailyAggregate> = BTreeMap::new();
        for entry in &self.history {
            daily
                .entry(entry.date_key.clone())
                .or_default()
                .add(entry.category, entry.minutes);
        }
        daily
    }

    /// Date-keys whose cached aggregate disagrees with `history`.
    ///
    /// A key present on only one side counts as a mismatch, except cached
    /// all-zero days, which `history` cannot produce but which are harmless.
    pub fn inconsistent_days(&self) -> Vec<String> {
        let recomputed = self.recompute_daily();
        let mut keys: Vec<String> = self
            .daily
            .iter()
            .filter(|(key, cached)| {
                let expected = recomputed.get(*key).copied().unwrap_or_default();
                **cached != expected
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.extend(
            recomputed
                .keys()
                .filter(|key| !self.daily.contains_key(*key))
                .cloned(),
        );
        keys.sort();
        keys
    }
}

/// Format an instant as its UTC calendar day (`YYYY-MM-DD`).
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Date-key for the day `offset_days` away from `at` (negative is the past).
pub fn date_key_offset(at: DateTime<Utc>, offset_days: i64) -> String {
    date_key(at + Duration::days(offset_days))
}
