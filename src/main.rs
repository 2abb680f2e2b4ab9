use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use milight_daemon::config::DEFAULT_CONFIG_PATH;
use milight_daemon::server::{self, AppState};
use milight_daemon::*;
use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the HTTP port from the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP daemon
    Serve,
    /// Turn group(s) on
    On {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
    },
    /// Turn group(s) off
    Off {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
    },
    /// Set a custom RGB color
    Rgb {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
        /// Red value (0-255)
        #[arg(short, long)]
        red: String,
        /// Green value (0-255)
        #[arg(short = 'G', long)]
        green: String,
        /// Blue value (0-255)
        #[arg(short, long)]
        blue: String,
    },
    /// Set brightness
    Brightness {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
        /// Brightness level (1-100)
        #[arg(short, long)]
        level: String,
    },
    /// Set a named palette color
    Color {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
        /// Palette color name (violet, blue, ..., lavendar)
        name: String,
    },
    /// Switch to white light
    White {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
    },
    /// Switch to night light
    Night {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
    },
    /// Toggle disco mode or change its speed
    Disco {
        /// Group id (1-based, 0 for all groups)
        #[arg(short, long, default_value = "0")]
        group: String,
        /// Speed change (up, down)
        #[arg(short, long)]
        speed: Option<String>,
    },
}

impl Commands {
    /// Maps a direct command onto the same raw parameters the HTTP API takes
    fn into_request(self) -> Option<(CommandKind, RawParams)> {
        let with_group = |group: String| RawParams {
            group: Some(group),
            ..Default::default()
        };
        let request = match self {
            Commands::Serve => return None,
            Commands::On { group } => (CommandKind::On, with_group(group)),
            Commands::Off { group } => (CommandKind::Off, with_group(group)),
            Commands::Rgb {
                group,
                red,
                green,
                blue,
            } => (
                CommandKind::Rgb,
                RawParams {
                    r: Some(red),
                    g: Some(green),
                    b: Some(blue),
                    ..with_group(group)
                },
            ),
            Commands::Brightness { group, level } => (
                CommandKind::Brightness,
                RawParams {
                    level: Some(level),
                    ..with_group(group)
                },
            ),
            Commands::Color { group, name } => (
                CommandKind::Color,
                RawParams {
                    color: Some(name),
                    ..with_group(group)
                },
            ),
            Commands::White { group } => (CommandKind::White, with_group(group)),
            Commands::Night { group } => (CommandKind::Night, with_group(group)),
            Commands::Disco { group, speed } => (
                CommandKind::Disco,
                RawParams {
                    speed,
                    ..with_group(group)
                },
            ),
        };
        Some(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with pretty colors
    let default_filter = if cli.verbose {
        "milight_daemon=debug,milightd=debug"
    } else {
        "milight_daemon=info,milightd=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let config = Config::load(&cli.config)
        .inspect_err(|e| error!("Refusing to start: {}", e))
        .wrap_err("failed to load configuration")?;
    debug!(?config, "Loaded configuration");

    let dispatcher = build_dispatcher(&config).await?;

    match cli.command.unwrap_or(Commands::Serve).into_request() {
        None => {
            let port = cli.port.unwrap_or(config.port);
            let listener = TcpListener::bind(("0.0.0.0", port))
                .await
                .wrap_err_with(|| format!("failed to bind port {port}"))?;
            server::serve(listener, AppState::new(dispatcher)).await?;
        }
        Some((kind, params)) => {
            let (operation, dispatched) = dispatcher.execute(kind, &params).await?;
            println!("{}", server::describe(operation, dispatched));
        }
    }

    Ok(())
}

/// Creates the group registry and bridge connection described by `config`
#[instrument(skip(config), fields(bridge = %config.bridge, groups = config.groups))]
async fn build_dispatcher(config: &Config) -> Result<CommandDispatcher<LimitlessBridge>> {
    let registry = Arc::new(GroupRegistry::new(config.groups)?);
    let bridge_addr = config.bridge_addr();
    let bridge = LimitlessBridge::connect(&bridge_addr)
        .await
        .wrap_err_with(|| format!("failed to open bridge connection to {bridge_addr}"))?;
    info!("Using bridge {} with {} groups", bridge_addr, registry.len());

    Ok(CommandDispatcher::new(registry, Arc::new(bridge)).with_pacing(config.pacing()))
}
