use clap::Subcommand;
use repcue_core::clock::ManualTimers;
use repcue_core::Config;
use tracing::info;

use super::reminder::open_scheduler;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "reminders.enabled", "session.rest_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            if key == "reminders.enabled" && !config.reminders.enabled {
                let mut scheduler = open_scheduler(ManualTimers::new(), true)?;
                let cancelled = scheduler.pending().len();
                scheduler.set_enabled(false);
                info!(cancelled, "reminders switched off");
                println!("ok (cancelled {cancelled} reminders)");
            } else {
                println!("ok");
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
