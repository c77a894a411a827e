use drift_core::reward_for_minutes;

use super::{open_engine, print_state};

pub fn doom(minutes: u32, activity: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    engine.add_minutes(minutes, activity)?;
    print_state(engine.state())
}

pub fn good(
    minutes: u32,
    activity: &str,
    coins: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let coins = coins.unwrap_or_else(|| reward_for_minutes(minutes));
    engine.replace_with_minutes(activity, minutes, coins)?;
    print_state(engine.state())
}
