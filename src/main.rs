/// Version injected at compile time via GCFBRIDGE_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCFBRIDGE_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcfbridge::config::Config;
use gcfbridge::gcp::auth::Auth;
use gcfbridge::gcp::client::FunctionsClient;
use gcfbridge::gcp::http::format_gcp_error;
use gcfbridge::translate::update_mask_param;
use gcfbridge::{
    endpoint_from_function, function_from_endpoint, CloudFunction, Diagnostic, Endpoint,
    StorageSource,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Translate function endpoints to and from Cloud Functions v2 resources
#[derive(Parser, Debug)]
#[command(name = "gcfbridge", version = VERSION, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Cloud Functions region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Use this bearer token instead of Application Default Credentials
    #[arg(long, env = "GCFBRIDGE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate an endpoint file (YAML or JSON) into a CloudFunction request body
    ToFunction {
        /// Endpoint file
        endpoint: PathBuf,
        /// Bucket holding the uploaded source archive
        #[arg(long)]
        bucket: String,
        /// Object name of the uploaded source archive
        #[arg(long)]
        object: String,
        #[arg(long, default_value_t = 0)]
        generation: i64,
        /// Also print the update mask
        #[arg(long)]
        mask: bool,
    },
    /// Translate a CloudFunction file (YAML or JSON) back into an endpoint
    ToEndpoint {
        function: PathBuf,
    },
    /// Print the update mask for a CloudFunction file
    Mask {
        function: PathBuf,
    },
    /// List deployed functions as endpoints
    List {
        /// List every region instead of the selected one
        #[arg(long)]
        all: bool,
    },
    /// Show one deployed function as an endpoint
    Get {
        id: String,
    },
    /// Delete a deployed function
    Delete {
        id: String,
    },
    /// Persist the selected project and region as defaults
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcfbridge started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcfbridge").join("gcfbridge.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcfbridge").join("gcfbridge.log");
    }
    PathBuf::from("gcfbridge.log")
}

/// Reads a YAML or JSON document (JSON is valid YAML)
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
}

struct Session {
    client: FunctionsClient,
    project: String,
    region: String,
}

impl Session {
    async fn open(args: &Args, config: &Config) -> Result<Self> {
        let project = args
            .project
            .clone()
            .or_else(|| config.effective_project())
            .context("No project configured. Pass --project or run 'gcloud config set project'")?;
        let region = args.region.clone().unwrap_or_else(|| config.effective_region());

        let auth = match &args.access_token {
            Some(token) => Auth::StaticToken(token.clone()),
            None => Auth::application_default().await?,
        };
        let client = FunctionsClient::new(&config.client_config(), auth)?;

        Ok(Self { client, project, region })
    }
}

fn endpoints_from(functions: &[CloudFunction]) -> Result<Vec<Endpoint>> {
    functions
        .iter()
        .map(|function| {
            let translated = endpoint_from_function(function)?;
            report(&translated.diagnostics);
            Ok(translated.value)
        })
        .collect()
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    match &args.command {
        Command::ToFunction {
            endpoint,
            bucket,
            object,
            generation,
            mask,
        } => {
            let endpoint: Endpoint = read_document(endpoint)?;
            let source = StorageSource {
                bucket: bucket.clone(),
                object: object.clone(),
                generation: *generation,
            };
            let translated = function_from_endpoint(&endpoint, source)?;
            report(&translated.diagnostics);
            print_json(&translated.value)?;
            if *mask {
                println!("updateMask={}", update_mask_param(&translated.value)?);
            }
        }
        Command::ToEndpoint { function } => {
            let function: CloudFunction = read_document(function)?;
            let translated = endpoint_from_function(&function)?;
            report(&translated.diagnostics);
            print_json(&translated.value)?;
        }
        Command::Mask { function } => {
            let function: CloudFunction = read_document(function)?;
            println!("{}", update_mask_param(&function)?);
        }
        Command::List { all } => {
            let session = Session::open(&args, &config).await?;
            let functions = if *all {
                let response = session.client.list_all_functions(&session.project).await?;
                for region in &response.unreachable {
                    eprintln!("warning: region {} is unreachable", region);
                }
                response.functions
            } else {
                session
                    .client
                    .list_functions(&session.project, &session.region)
                    .await?
            };
            print_json(&endpoints_from(&functions)?)?;
        }
        Command::Get { id } => {
            let session = Session::open(&args, &config).await?;
            let function = session
                .client
                .get_function(&session.project, &session.region, id)
                .await?;
            print_json(&endpoints_from(std::slice::from_ref(&function))?)?;
        }
        Command::Delete { id } => {
            let session = Session::open(&args, &config).await?;
            let name = gcfbridge::endpoint::function_name(&session.project, &session.region, id);
            let operation = session.client.delete_function(&name).await?;
            println!("{}", operation.name);
        }
        Command::Config => {
            if let Some(project) = &args.project {
                config.set_project(project)?;
            }
            if let Some(region) = &args.region {
                config.set_region(region)?;
            }
            print_json(&config)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Logging disabled: {err:?}");
            None
        }
    };

    if let Err(err) = run(args).await {
        tracing::error!("{err:?}");
        eprintln!("Error: {}", format_gcp_error(&err));
        std::process::exit(1);
    }
}
