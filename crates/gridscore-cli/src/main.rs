use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gridscore",
    about = "gridscore — rule-based node scoring for build scheduling",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and list the scoring rules in order
    Check {
        /// Path to gridscore.toml
        #[arg(short, long, default_value = "gridscore.toml")]
        config: String,
    },
    /// Score the configured nodes for a task and print the placement.
    ///
    /// Every chunk may run on every configured node. Nodes are probed
    /// through the channel given by their `probe` entry.
    Schedule {
        #[arg(short, long, default_value = "gridscore.toml")]
        config: String,
        /// Task name
        #[arg(short, long)]
        task: String,
        /// Number of work chunks to place
        #[arg(long, default_value_t = 1)]
        chunks: usize,
        /// Label preference of the task, as `label=score` (repeatable)
        #[arg(long = "prefer", value_name = "LABEL=SCORE")]
        preferences: Vec<String>,
        /// Past build of the task, newest first, as `node=result` (repeatable)
        #[arg(long = "build", value_name = "NODE=RESULT")]
        builds: Vec<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,gridscore=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => commands::check::check(&config),
        Commands::Schedule {
            config,
            task,
            chunks,
            preferences,
            builds,
            format,
        } => {
            let request = commands::schedule::Request {
                task,
                chunks,
                preferences,
                builds,
            };
            commands::schedule::schedule(&config, &request, &format).await
        }
    }
}
