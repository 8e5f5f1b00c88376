use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stint-cli", version, about = "Stint focus timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        /// Engine context to operate on
        #[arg(long, value_enum, default_value = "focus")]
        context: commands::timer::ContextArg,
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Time record review
    Records {
        #[command(subcommand)]
        action: commands::records::RecordsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Alarm device control
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stint_core=warn,stint_cli=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { context, action } => commands::timer::run(context, action),
        Commands::Records { action } => commands::records::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Alarm { action } => commands::alarm::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
