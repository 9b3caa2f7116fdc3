use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lunman::cli;
use lunman::cli::commands::{
    AssocCommands, AuthCommands, ExtentCommands, InitiatorCommands, PortalCommands, TargetCommands,
};

#[derive(Parser)]
#[command(name = "lunman")]
#[command(about = "An iSCSI target topology manager", long_about = None)]
struct Cli {
    /// Data directory for the configuration database
    #[arg(long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Optional TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Edit the database without signaling the storage service
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration database
    Init,

    /// Manage portals
    Portal {
        #[command(subcommand)]
        command: PortalCommands,
    },

    /// Manage authorized access credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage initiator access lists
    Initiator {
        #[command(subcommand)]
        command: InitiatorCommands,
    },

    /// Manage targets
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },

    /// Manage extents
    Extent {
        #[command(subcommand)]
        command: ExtentCommands,
    },

    /// Manage target-extent associations
    Assoc {
        #[command(subcommand)]
        command: AssocCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return cli::run_init(&cli.data_dir);
    }

    let engine = cli::build_engine(&cli.data_dir, cli.config.as_deref(), cli.offline)?;
    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Portal { command } => cli::run_portal(&engine, command),
        Commands::Auth { command } => cli::run_auth(&engine, command),
        Commands::Initiator { command } => cli::run_initiator(&engine, command),
        Commands::Target { command } => cli::run_target(&engine, command),
        Commands::Extent { command } => cli::run_extent(&engine, command),
        Commands::Assoc { command } => cli::run_assoc(&engine, command),
    }
}
