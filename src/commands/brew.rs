use clap::{Args, Subcommand};
use std::io::{self, Write};

use brewlog_core::models::format_brew_time;
use brewlog_core::{BrewEntry, BrewFields, BrewFilter, BrewMethod, Journal, Served, StoreError};

use super::OutputFormat;

#[derive(Args)]
pub struct BrewCommand {
    #[command(subcommand)]
    pub command: BrewSubcommand,
}

#[derive(Subcommand)]
pub enum BrewSubcommand {
    /// Log a new brew
    Create {
        /// Coffee (e.g., "Ethiopian Yirgacheffe")
        #[arg(long)]
        coffee_type: String,

        /// Brew method (e.g., "Pour Over", pour-over, v60)
        #[arg(long, short)]
        method: BrewMethod,

        /// Grind size (e.g., "Medium-Fine")
        #[arg(long)]
        grind: String,

        /// Water temperature in °F
        #[arg(long, default_value_t = 200)]
        temp: i32,

        /// Brew time in seconds
        #[arg(long, default_value_t = 240)]
        time: i32,

        /// Coffee to water ratio
        #[arg(long, default_value = "1:15")]
        ratio: String,

        /// Tasting notes
        #[arg(long)]
        notes: Option<String>,

        /// Rating from 1 to 5
        #[arg(long, default_value_t = 3)]
        rating: i32,
    },

    /// List brews, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only brews made with this method
        #[arg(long, short)]
        method: Option<BrewMethod>,
    },

    /// Show a brew's details
    Show {
        /// Brew ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing brew
    Update {
        /// Brew ID
        id: String,

        #[arg(long)]
        coffee_type: Option<String>,

        #[arg(long, short)]
        method: Option<BrewMethod>,

        #[arg(long)]
        grind: Option<String>,

        /// Water temperature in °F
        #[arg(long)]
        temp: Option<i32>,

        /// Brew time in seconds
        #[arg(long)]
        time: Option<i32>,

        #[arg(long)]
        ratio: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the tasting notes
        #[arg(long)]
        clear_notes: bool,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: Option<i32>,
    },

    /// Delete a brew
    Delete {
        /// Brew ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// List the brew methods a brew can record
    Methods,
}

/// Tells the user when the answer came from this device only.
fn note_backend<T>(served: &Served<T>) {
    if served.is_fallback() {
        eprintln!("(remote store unavailable; using local storage)");
    }
}

fn print_table(brews: &[BrewEntry]) {
    println!(
        "{:<36}  {:<17}  {:<12}  {:<28}  RATING",
        "ID", "BREWED", "METHOD", "COFFEE"
    );
    println!("{}", "-".repeat(105));
    for brew in brews {
        let coffee = if brew.fields.coffee_type.chars().count() > 28 {
            let short: String = brew.fields.coffee_type.chars().take(25).collect();
            format!("{}...", short)
        } else {
            brew.fields.coffee_type.clone()
        };
        println!(
            "{:<36}  {:<17}  {:<12}  {:<28}  {}/5",
            brew.id,
            brew.created_at.format("%Y-%m-%d %H:%M"),
            brew.fields.brew_method.as_str(),
            coffee,
            brew.fields.rating
        );
    }
    println!("\nTotal: {} brew(s)", brews.len());
}

impl BrewCommand {
    pub async fn run(&self, journal: &Journal) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BrewSubcommand::Create {
                coffee_type,
                method,
                grind,
                temp,
                time,
                ratio,
                notes,
                rating,
            } => {
                let mut fields = BrewFields::new(coffee_type.trim(), *method, grind.trim())
                    .with_water_temp(*temp)
                    .with_brew_time(*time)
                    .with_ratio(ratio.trim())
                    .with_rating(*rating);
                if let Some(notes) = notes {
                    fields = fields.with_notes(notes);
                }

                let served = journal.create(fields).await?;
                note_backend(&served);
                println!("Logged brew:");
                println!("{}", served.value);
                Ok(())
            }

            BrewSubcommand::List { format, method } => {
                let served = journal.list_filtered(BrewFilter::from(*method)).await?;
                note_backend(&served);
                let brews = served.value;

                if brews.is_empty() {
                    println!("No brews logged yet");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&brews)?);
                    }
                    OutputFormat::Text => print_table(&brews),
                }
                Ok(())
            }

            BrewSubcommand::Show { id, format } => {
                let served = journal.get(id).await?;
                note_backend(&served);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&served.value)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", served.value);
                    }
                }
                Ok(())
            }

            BrewSubcommand::Update {
                id,
                coffee_type,
                method,
                grind,
                temp,
                time,
                ratio,
                notes,
                clear_notes,
                rating,
            } => {
                // Check if any updates were provided
                let has_updates = coffee_type.is_some()
                    || method.is_some()
                    || grind.is_some()
                    || temp.is_some()
                    || time.is_some()
                    || ratio.is_some()
                    || notes.is_some()
                    || *clear_notes
                    || rating.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut fields = journal.get(id).await?.value.fields;

                if let Some(coffee_type) = coffee_type {
                    fields.coffee_type = coffee_type.trim().to_string();
                }
                if let Some(method) = method {
                    fields.brew_method = *method;
                }
                if let Some(grind) = grind {
                    fields.grind_size = grind.trim().to_string();
                }
                if let Some(temp) = temp {
                    fields.water_temp = *temp;
                }
                if let Some(time) = time {
                    fields.brew_time = *time;
                }
                if let Some(ratio) = ratio {
                    fields.ratio = ratio.trim().to_string();
                }
                if let Some(notes) = notes {
                    fields.notes = Some(notes.clone());
                }
                if *clear_notes {
                    fields.notes = None;
                }
                if let Some(rating) = rating {
                    fields.rating = *rating;
                }

                let served = journal.update(id, fields).await?;
                note_backend(&served);
                println!("Updated brew:");
                println!("{}", served.value);
                Ok(())
            }

            BrewSubcommand::Delete { id, force } => {
                // Confirm deletion unless --force is used
                if !force {
                    let brew = match journal.get(id).await {
                        Ok(served) => served.value,
                        Err(StoreError::NotFound(_)) => {
                            println!("No brew with id {}; nothing to delete.", id);
                            return Ok(());
                        }
                        Err(e) => return Err(e.into()),
                    };

                    print!(
                        "Delete {} brew of '{}' ({})? [y/N] ",
                        brew.fields.brew_method,
                        brew.fields.coffee_type,
                        format_brew_time(brew.fields.brew_time)
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let served = journal.delete(id).await?;
                note_backend(&served);
                println!("Deleted brew: {}", id);
                Ok(())
            }

            BrewSubcommand::Methods => {
                for method in BrewMethod::ALL {
                    println!("{}", method);
                }
                Ok(())
            }
        }
    }
}
