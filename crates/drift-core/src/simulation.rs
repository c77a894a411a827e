//! Synthetic month generator for demo data.
//!
//! Produces thirty days of randomized doom and good sessions ending today,
//! together with the aggregates, coin total and net doom balance they imply.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::state::{date_key, date_key_offset, ActivityTypes, Category, DailyAggregate, HistoryEntry, Source};

/// Number of simulated days, today included.
pub const SIMULATED_DAYS: i64 = 30;

/// Activity used when no doom activities are configured.
pub const PLACEHOLDER_DOOM: &str = "Simulated Doom";

/// Activity used when no good activities are configured.
pub const PLACEHOLDER_GOOD: &str = "Simulated Good";

/// Coins earned for a good session: `max(1, round(log2(minutes)))`.
pub fn reward_for_minutes(minutes: u32) -> u32 {
    if minutes == 0 {
        return 1;
    }
    let reward = f64::from(minutes).log2().round() as u32;
    reward.max(1)
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedMonth {
    pub history: Vec<HistoryEntry>,
    pub daily: BTreeMap<String, DailyAggregate>,
    pub coins: u64,
    /// `max(today.doom - today.good, 0)`.
    pub minutes_today: u64,
}

/// Random month generator.
pub struct MonthSimulator {
    rng: Mcg128Xsl64,
}

impl MonthSimulator {
    /// Create a simulator. `None` seeds from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }

    /// Simulate the 30 days ending at `now`, oldest day first.
    pub fn run(&mut self, now: DateTime<Utc>, activity_types: &ActivityTypes) -> SimulatedMonth {
        let doom_apps = pool(&activity_types.doom, PLACEHOLDER_DOOM);
        let good_acts = pool(&activity_types.good, PLACEHOLDER_GOOD);

        let mut history = Vec::new();
        let mut daily = BTreeMap::new();
        let mut coins = 0u64;

        for offset in -(SIMULATED_DAYS - 1)..=0 {
            let day_key = date_key_offset(now, offset);
            let mut day = DailyAggregate::default();

            let doom_sessions = self.rng.gen_range(1..=4);
            for _ in 0..doom_sessions {
                let minutes = self.rng.gen_range(1..=8u32) * 5;
                let activity = self.pick(&doom_apps);
                day.add(Category::Doom, minutes);
                history.push(HistoryEntry::new(
                    now,
                    day_key.clone(),
                    activity,
                    Category::Doom,
                    minutes,
                    0,
                    Source::Sim,
                ));
            }

            let good_sessions = self.rng.gen_range(0..=2);
            for _ in 0..good_sessions {
                let minutes = self.rng.gen_range(1..=10u32) * 5;
                let activity = self.pick(&good_acts);
                let coins_delta = reward_for_minutes(minutes);
                day.add(Category::Good, minutes);
                coins += u64::from(coins_delta);
                history.push(HistoryEntry::new(
                    now,
                    day_key.clone(),
                    activity,
                    Category::Good,
                    minutes,
                    coins_delta,
                    Source::Sim,
                ));
            }

            daily.insert(day_key, day);
        }

        let minutes_today = daily
            .get(&date_key(now))
            .map(DailyAggregate::net_doom)
            .unwrap_or(0);

        SimulatedMonth {
            history,
            daily,
            coins,
            minutes_today,
        }
    }

    fn pick(&mut self, pool: &[String]) -> String {
        pool.choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }
}

fn pool(configured: &[String], placeholder: &str) -> Vec<String> {
    if configured.is_empty() {
        vec![placeholder.to_string()]
    } else {
        configured.to_vec()
    }
}
