use clap::Subcommand;
use drift_core::Category;

use super::open_engine;

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Add an activity name to a category
    Add {
        /// "doom" or "good"
        category: String,
        /// Activity name
        name: String,
    },
    /// Remove every occurrence of an activity name from a category
    Remove {
        /// "doom" or "good"
        category: String,
        /// Activity name
        name: String,
    },
    /// List activity names per category
    List,
}

pub fn run(action: ActivityAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;

    match action {
        ActivityAction::Add { category, name } => {
            let category: Category = category.parse()?;
            engine.add_activity_type(category, &name)?;
        }
        ActivityAction::Remove { category, name } => {
            let category: Category = category.parse()?;
            engine.remove_activity_type(category, &name)?;
        }
        ActivityAction::List => {}
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&engine.state().activity_types)?
    );
    Ok(())
}
