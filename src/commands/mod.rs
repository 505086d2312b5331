pub mod brew;
mod config_cmd;
mod health;

use clap::ValueEnum;

pub use brew::BrewCommand;
pub use config_cmd::ConfigCommand;
pub use health::HealthCommand;

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
