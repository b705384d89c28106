use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use peon_cli::{CliContext, commands, daemon, logging};
use peon_core::context::DeliveryMode;
use peon_types::Category;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeliveryArg {
    /// Relay inside SSH sessions, native player otherwise
    Auto,
    /// Native player on this machine
    Direct,
    /// Browser relay page
    Relay,
}

impl From<DeliveryArg> for DeliveryMode {
    fn from(arg: DeliveryArg) -> Self {
        match arg {
            DeliveryArg::Auto => DeliveryMode::Auto,
            DeliveryArg::Direct => DeliveryMode::Direct,
            DeliveryArg::Relay => DeliveryMode::Relay,
        }
    }
}

#[derive(Parser)]
#[command(name = "remote-peon", version)]
#[command(about = "Plays a sound when your coding agent needs you, even over SSH")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured audio delivery
    #[arg(long, global = true, value_enum)]
    delivery: Option<DeliveryArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the signal file and play sounds (default)
    Run,
    /// List installed sound packs, or pick one
    Packs {
        #[command(subcommand)]
        action: Option<PackAction>,
    },
    /// Play each enabled category, or just one
    Preview {
        #[arg(value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Write a signal record, as the agent hook would
    Emit {
        #[arg(value_parser = parse_category)]
        category: Category,
    },
    /// Turn one category's sound on or off
    Toggle {
        #[arg(value_parser = parse_category)]
        category: Category,
        #[arg(value_enum)]
        state: Switch,
    },
    /// Print the config file location and contents
    Config,
}

#[derive(Subcommand)]
enum PackAction {
    /// List installed sound packs (default)
    List,
    /// Make an installed pack the active one
    Use { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn parse_category(token: &str) -> Result<Category, String> {
    token.parse().map_err(|e: peon_types::UnknownCategory| {
        let known: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        format!("{e} (expected one of: {})", known.join(", "))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let ctx = CliContext::new(cli.config, cli.delivery.map(DeliveryMode::from));

    let command = cli.command.unwrap_or(Commands::Run);

    // Only the daemon writes the log file
    let _log_guard = match command {
        Commands::Run => logging::init(),
        _ => {
            logging::init_stdout_only();
            None
        }
    };

    match command {
        Commands::Run => daemon::run(&ctx).await,
        Commands::Packs { action } => match action.unwrap_or(PackAction::List) {
            PackAction::List => commands::show_packs(&ctx),
            PackAction::Use { id } => commands::use_pack(&ctx, &id),
        },
        Commands::Preview { category } => commands::preview(&ctx, category).await,
        Commands::Emit { category } => commands::emit(&ctx, category),
        Commands::Toggle { category, state } => {
            commands::set_category(&ctx, category, matches!(state, Switch::On))
        }
        Commands::Config => commands::show_config(&ctx),
    }
}
