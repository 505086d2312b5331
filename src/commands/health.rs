use clap::Args;

use brewlog_core::Journal;

use super::OutputFormat;

#[derive(Args)]
pub struct HealthCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAIL"
    }
}

impl HealthCommand {
    pub async fn run(&self, journal: &Journal) -> Result<(), Box<dyn std::error::Error>> {
        let report = journal.health().await;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                println!("System Health Check");
                println!("===================\n");
                println!("Local storage:     {}", status(report.local_storage));
                println!("Remote configured: {}", status(report.remote_configured));
                println!("Remote reachable:  {}", status(report.remote_reachable));
                if let Some(err) = &report.remote_error {
                    println!("  {}", err);
                }
                println!();
                println!("Version: {}", report.version);
                println!("Checked: {}", report.checked_at.to_rfc3339());
                println!(
                    "\nOverall: {}",
                    if report.is_healthy() {
                        "healthy"
                    } else {
                        "unhealthy"
                    }
                );
            }
        }

        if report.is_healthy() {
            Ok(())
        } else {
            Err("local storage is not writable".into())
        }
    }
}
