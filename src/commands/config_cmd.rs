use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn show_optional(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("storage_key: {}", config.storage_key.value);
                        println!("  source: {}", config.storage_key.source);
                        println!();

                        let remote = &config.remote;
                        println!("remote:");
                        println!("  endpoint: {}", show_optional(remote.endpoint.as_deref()));
                        println!("  region: {}", remote.region);
                        println!(
                            "  access_key_id: {}",
                            show_optional(remote.access_key_id.as_deref())
                        );
                        println!(
                            "  secret_access_key: {}",
                            if remote.secret_access_key.is_some() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!("  table_name: {}", remote.table_name);
                        println!("  timeout_secs: {}", remote.timeout_secs);
                        println!("  required: {}", remote.required);
                        if !remote.is_configured() {
                            println!(
                                "  status: not configured (missing {}); brews are stored locally",
                                remote.missing().join(", ")
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
