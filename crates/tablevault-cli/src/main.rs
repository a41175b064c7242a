use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tablevault",
    about = "tablevault — periodic table backup automation",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview how a set of tables would be packed into backup jobs.
    ///
    /// Tables are read from a JSON file containing an array of table
    /// descriptors. Without --config a built-in offline configuration is
    /// used.
    Plan {
        /// JSON file with the table descriptors
        #[arg(short, long)]
        tables: PathBuf,
        /// Account configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also print each job in wire format
        #[arg(short, long)]
        wire: bool,
    },
    /// Emit the wire-format JSON for one scheduled job
    Render {
        /// JSON file with the table descriptors
        #[arg(short, long)]
        tables: PathBuf,
        /// Account configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Index of the job to render
        #[arg(short, long)]
        job: usize,
    },
    /// Show the latest capacity snapshot in a filesystem object store
    Snapshot {
        /// Root directory of the object store
        #[arg(short, long)]
        dir: PathBuf,
        /// Bucket (subdirectory) holding the snapshots
        #[arg(short, long, default_value = "backups")]
        bucket: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tablevault=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            tables,
            config,
            wire,
        } => commands::plan::plan(&tables, config.as_deref(), wire),
        Commands::Render {
            tables,
            config,
            job,
        } => commands::render::render(&tables, config.as_deref(), job),
        Commands::Snapshot { dir, bucket } => commands::snapshot::show(&dir, &bucket),
    }
}
