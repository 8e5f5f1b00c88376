use chrono::{Local, NaiveDate};
use clap::Subcommand;
use stint_core::store::Database;

#[derive(Subcommand)]
pub enum RecordsAction {
    /// List records for a day
    List {
        /// Day to list (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate run statistics
    Stats {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: RecordsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        RecordsAction::List { date, json } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let records = db.records_for_date(date)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no records for {date}");
            } else {
                let mut total_minutes = 0;
                for record in &records {
                    total_minutes += record.duration_minutes();
                    println!(
                        "{}-{}  {:>4}m  {}",
                        record.start_clock(),
                        record.end_clock(),
                        record.duration_minutes(),
                        record.task_name
                    );
                }
                println!("total: {} runs, {} min", records.len(), total_minutes);
            }
        }
        RecordsAction::Stats { json } => {
            let stats = db.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("today: {} runs, {} min", stats.today_runs, stats.today_minutes);
                println!("total: {} runs, {} min", stats.total_runs, stats.total_minutes);
            }
        }
    }
    Ok(())
}
