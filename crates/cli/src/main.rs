mod bundle_commands;
mod catalog_commands;
mod install_commands;
mod render;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    skillman_config::SkillmanConfig,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "skillman",
    version,
    about = "Catalog, validate and install skill bundles"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: ./skillman.toml, then the user config directory).
    #[arg(long, global = true, env = "SKILLMAN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List skills in the catalog directory.
    #[command(visible_alias = "ls")]
    List {
        /// Show path and license for each skill.
        #[arg(short, long)]
        verbose: bool,
        #[arg(long)]
        json: bool,
    },
    /// Search skills by name or description.
    #[command(visible_alias = "find")]
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show details about a skill.
    #[command(visible_alias = "info")]
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Print a skill's SKILL.md for an agent to read.
    #[command(visible_alias = "get")]
    Load {
        name: String,
        /// Print only the description and headings.
        #[arg(long)]
        outline: bool,
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a skill with its resource listing.
    Export {
        name: String,
        #[arg(long, value_enum, default_value_t = render::ExportFormat::Md)]
        format: render::ExportFormat,
        /// Output file (default: <name>.<format>).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a new skill from a template.
    #[command(visible_aliases = ["new", "create"])]
    Init {
        name: String,
        /// Parent directory (default: the catalog directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Check a skill directory for format problems.
    #[command(visible_alias = "check")]
    Validate {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Edit a skill's frontmatter.
    #[command(visible_alias = "config")]
    Set(bundle_commands::SetArgs),
    /// Install a skill from a local directory or a GitHub repository.
    #[command(visible_alias = "add")]
    Install {
        /// `./path`, `/path`, `../path`, or `owner/repo[/sub/path]`.
        source: String,
        /// Install into the global directory instead of the project.
        #[arg(short, long)]
        global: bool,
        /// Replace an existing install.
        #[arg(short, long)]
        force: bool,
    },
    /// Remove an installed skill.
    #[command(visible_aliases = ["remove", "rm"])]
    Uninstall {
        name: String,
        #[arg(short, long)]
        global: bool,
    },
    /// List installed skills.
    #[command(visible_alias = "managed")]
    Installed {
        /// Only the global directory.
        #[arg(short, long)]
        global: bool,
        /// Only the project directory.
        #[arg(long)]
        project: bool,
        #[arg(long)]
        json: bool,
    },
    /// Search GitHub for repositories containing skills.
    #[command(visible_alias = "gh")]
    Github {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        json: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config: SkillmanConfig = skillman_config::load_from(cli.config.as_deref())?;
    let cwd = std::env::current_dir()?;
    debug!(version = env!("CARGO_PKG_VERSION"), cwd = %cwd.display(), "skillman starting");

    match cli.command {
        Commands::List { verbose, json } => {
            catalog_commands::handle_list(&config, &cwd, verbose, json).await
        },
        Commands::Search { query, json } => {
            catalog_commands::handle_search(&config, &cwd, &query, json).await
        },
        Commands::Show { name, json } => {
            catalog_commands::handle_show(&config, &cwd, &name, json).await
        },
        Commands::Load {
            name,
            outline,
            output,
        } => catalog_commands::handle_load(&config, &cwd, &name, outline, output).await,
        Commands::Export {
            name,
            format,
            output,
        } => catalog_commands::handle_export(&config, &cwd, &name, format, output).await,
        Commands::Init { name, path } => {
            bundle_commands::handle_init(&config, &cwd, &name, path).await
        },
        Commands::Validate { path, json } => bundle_commands::handle_validate(&path, json).await,
        Commands::Set(args) => bundle_commands::handle_set(args).await,
        Commands::Install {
            source,
            global,
            force,
        } => install_commands::handle_install(&config, &cwd, &source, global, force).await,
        Commands::Uninstall { name, global } => {
            install_commands::handle_uninstall(&config, &cwd, &name, global).await
        },
        Commands::Installed {
            global,
            project,
            json,
        } => install_commands::handle_installed(&config, &cwd, global, project, json).await,
        Commands::Github { query, limit, json } => {
            install_commands::handle_github(&config, &query, limit, json).await
        },
    }
}
