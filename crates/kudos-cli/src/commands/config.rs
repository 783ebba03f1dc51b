use clap::Subcommand;
use kudos_core::EngineConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the active configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: base_points, streak_bonus_step, claim_interval_hours
        key: String,
        value: i64,
    },
    /// Print the config file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = EngineConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = EngineConfig::load()?;
            match key.as_str() {
                "base_points" => config.base_points = value,
                "streak_bonus_step" => config.streak_bonus_step = value,
                "claim_interval_hours" => config.claim_interval_hours = value,
                other => return Err(format!("unknown config key: {other}").into()),
            }
            config.validate()?;
            config.save()?;
            println!("{key} = {value}");
        }
        ConfigAction::Path => {
            println!("{}", EngineConfig::path()?.display());
        }
    }
    Ok(())
}
