use serde_json::json;

use super::{open_engine, print_state};

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    print_state(engine.state())
}

pub fn today() -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    let day = engine.today();
    let out = json!({
        "date": engine.today_key(),
        "doom": day.doom,
        "good": day.good,
        "minutesToday": engine.state().minutes_today,
        "coins": engine.state().coins,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn summary() -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    println!("{}", serde_json::to_string_pretty(&engine.summary())?);
    Ok(())
}

pub fn check() -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    let mismatched = engine.check_consistency();
    let out = json!({
        "consistent": mismatched.is_empty(),
        "mismatchedDays": mismatched,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    if !mismatched.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

pub fn reset() -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    engine.reset_all()?;
    print_state(engine.state())
}

pub fn simulate(seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    match seed {
        Some(seed) => engine.simulate_month_with_seed(Some(seed))?,
        None => engine.simulate_month()?,
    }
    println!("{}", serde_json::to_string_pretty(&engine.summary())?);
    Ok(())
}
