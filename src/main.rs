use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use rollover_core::config::{self, Config};
use rollover_core::cookie::{Cookie, CookieOptions};

#[derive(Parser)]
#[command(
    name = "rollover",
    about = "Rolling cookie sessions for HTTP services",
    version = rollover_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Config file path (default: ~/.rollover/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the demo HTTP server
    Serve {
        /// Config file path (default: env / ~/.rollover/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// HTTP server port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Refresh session expiry on every request
        #[arg(long)]
        rolling: bool,
    },
    /// Encode and sign a JSON value as a Set-Cookie header
    Sign {
        /// JSON value to store, e.g. '{"user":"alice"}'
        value: String,
        /// Signing secret (repeat to rotate; the first one signs)
        #[arg(short, long)]
        secret: Vec<String>,
        /// Cookie name
        #[arg(short, long, default_value = "__session")]
        name: String,
        /// Max-Age in seconds
        #[arg(long)]
        max_age: Option<i64>,
    },
    /// Decode a Cookie request header
    Inspect {
        /// Cookie header, e.g. '__session=eyJ...'
        header: String,
        /// Verification secrets
        #[arg(short, long)]
        secret: Vec<String>,
        /// Cookie name
        #[arg(short, long, default_value = "__session")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rollover=info".parse()?)
                .add_directive("rollover_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config } => cmd_init(config)?,
        Commands::Serve {
            config,
            port,
            rolling,
        } => cmd_serve(config, port, rolling).await?,
        Commands::Sign {
            value,
            secret,
            name,
            max_age,
        } => cmd_sign(&value, secret, &name, max_age)?,
        Commands::Inspect {
            header,
            secret,
            name,
        } => cmd_inspect(&header, secret, &name)?,
    }

    Ok(())
}

// ====== Commands ======

fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(config::get_config_path);
    if path.exists() {
        println!("Config already exists at {}", path.display());
        println!("Delete it first to re-initialize.");
        return Ok(());
    }

    config::save_config(&Config::default(), Some(&path))?;
    println!("Created config at {}", path.display());
    println!("\nNext steps:");
    println!("  1. Add a signing secret under session.cookie.secrets");
    println!("  2. Run: rollover serve");
    Ok(())
}

#[cfg(feature = "http-api")]
async fn cmd_serve(path: Option<PathBuf>, port: Option<u16>, rolling: bool) -> Result<()> {
    use rollover_core::service::http::{serve, AppState};

    let mut cfg = match path {
        Some(p) => config::load_config(Some(&p)),
        None => config::load_config_from_env(),
    };
    if let Some(port) = port {
        cfg.server.port = port;
    }
    if rolling {
        cfg.session.rolling = true;
    }
    if cfg.session.cookie.secrets.is_empty() {
        tracing::warn!("No session secrets configured; cookies will be unsigned");
    }

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    println!(
        "Starting rollover demo on {} (storage: {:?}, rolling: {})",
        addr, cfg.session.storage, cfg.session.rolling
    );

    let state = std::sync::Arc::new(AppState::new(cfg));
    serve(&addr, state).await
}

#[cfg(not(feature = "http-api"))]
async fn cmd_serve(_path: Option<PathBuf>, _port: Option<u16>, _rolling: bool) -> Result<()> {
    eprintln!("HTTP API not available. Rebuild with: cargo build --features http-api");
    std::process::exit(1);
}

fn cmd_sign(value: &str, secrets: Vec<String>, name: &str, max_age: Option<i64>) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(value)?;
    let cookie = Cookie::new(
        name,
        CookieOptions {
            max_age,
            ..CookieOptions::default()
        },
    )
    .with_secrets(secrets);
    println!("{}", cookie.serialize(&value, None)?);
    Ok(())
}

fn cmd_inspect(header: &str, secrets: Vec<String>, name: &str) -> Result<()> {
    let cookie = Cookie::new(name, CookieOptions::default()).with_secrets(secrets);
    match cookie.parse(Some(header))? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None if cookie.is_signed() => println!("No valid {} cookie (missing or bad signature)", name),
        None => println!("No {} cookie", name),
    }
    Ok(())
}
