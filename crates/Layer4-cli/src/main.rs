//! Infrarun CLI - Main entry point

mod cli;
mod output;

use clap::{Parser, Subcommand};
use infrarun_foundation::ConfigLoader;
use infrarun_report::ParserRegistry;
use infrarun_tool::ToolCatalog;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Infrarun - run containerized IaC scanners and merge their findings
#[derive(Parser, Debug)]
#[command(name = "infrarun")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding extra tool definitions (overrides config)
    #[arg(long, global = true)]
    tools_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available tools
    List {
        /// Show image and parser of each tool
        #[arg(long)]
        detailed: bool,
    },
    /// Run tools against a directory
    Run {
        /// Directory to scan
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Glob scope offered to tools as %{glob}
        #[arg(long)]
        glob: Option<String>,

        /// Template value for one tool, e.g. kics.queries=["a","b"]
        #[arg(long = "set", value_name = "TOOL.KEY=VALUE")]
        set: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = cli::Format::Table)]
        format: cli::Format,

        /// Fail if any tool fails
        #[arg(long)]
        strict: bool,

        /// Tools to run
        #[arg(required = true)]
        tools: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the report
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let working_dir = std::env::current_dir()?;
    let mut config = ConfigLoader::new(&working_dir).load_all()?;
    if let Some(dir) = args.tools_dir {
        config.tools_dir = Some(dir);
    }

    let parsers = ParserRegistry::builtin();
    let mut catalog = ToolCatalog::builtin(&parsers)?;

    // Only an explicitly configured tools directory has to exist
    let tools_dir = working_dir.join(config.tools_dir());
    if config.tools_dir.is_some() || tools_dir.is_dir() {
        catalog.extend_overriding(ToolCatalog::load_dir(&tools_dir, &parsers)?);
    } else {
        debug!("No tools directory at {}", tools_dir.display());
    }

    match args.command {
        Command::List { detailed } => cli::list(&catalog, detailed),
        Command::Run {
            path,
            glob,
            set,
            format,
            strict,
            tools,
        } => {
            let options = cli::RunOptions {
                path,
                glob,
                overrides: set,
                format,
                strict,
                tools,
            };
            cli::run(&config, &catalog, options).await
        }
    }
}
