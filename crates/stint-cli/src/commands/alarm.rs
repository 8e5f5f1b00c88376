use std::time::Duration;

use clap::Subcommand;
use stint_core::store::Database;
use stint_core::{AlarmDevice, ChimeAlarm};

const CUE_KEY: &str = "alarm/cue";
const DEFAULT_CUE: &str = "chime";

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Ring the alarm device for a few seconds
    Test {
        /// Ring length in seconds
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },
    /// Print the active alarm cue
    Cue,
    /// Override the alarm cue
    SetCue {
        /// Cue name
        name: String,
    },
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmAction::Test { seconds } => {
            let alarm = ChimeAlarm::new();
            alarm.unlock();
            alarm.play(seconds.saturating_mul(1000));
            println!("ringing for {seconds}s");
            std::thread::sleep(Duration::from_secs(seconds));
            alarm.stop();
        }
        AlarmAction::Cue => {
            let db = Database::open()?;
            let cue = db.kv_get(CUE_KEY)?.unwrap_or_else(|| DEFAULT_CUE.to_string());
            println!("{cue}");
        }
        AlarmAction::SetCue { name } => {
            let db = Database::open()?;
            db.kv_set(CUE_KEY, &name)?;
            println!("ok");
        }
    }
    Ok(())
}
