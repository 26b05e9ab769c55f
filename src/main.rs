use anyhow::{Context, Result};
use armgen::azure::auth::ArmCredentials;
use armgen::azure::http::format_arm_error;
use armgen::azure::ResourceClient;
use armgen::config::Config;
use armgen::resource::{
    lifecycle, project, DataSourceConfig, ProviderContext, ResourceConfig, ResourceId,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage arbitrary Azure Resource Manager resources
#[derive(Parser, Debug)]
#[command(name = "armgen", version = armgen::VERSION, about, long_about = None)]
struct Args {
    /// Resource Manager endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer token for the Resource Manager API
    #[arg(long, global = true, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a resource by name, parent and type (data source)
    Read {
        #[arg(long)]
        name: String,
        /// Parent scope, empty for the tenant root
        #[arg(long, default_value = "")]
        parent_id: String,
        /// Resource type with API version, e.g. Microsoft.Storage/storageAccounts@2023-01-01
        #[arg(long = "type")]
        resource_type: String,
        /// Response paths to export into `output`
        #[arg(long = "export")]
        exports: Vec<String>,
    },
    /// Create a resource described by a JSON or YAML file
    Create {
        file: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Update a resource described by a JSON or YAML file
    Update {
        file: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Read a resource by its id
    Show {
        id: String,
        #[arg(long = "export")]
        exports: Vec<String>,
    },
    /// Delete a resource by its id
    Delete { id: String },
    /// Import an existing resource by its id
    Import {
        id: String,
        #[arg(long = "export")]
        exports: Vec<String>,
    },
    /// Decompose an id into name, parent, type and API version
    ParseId { id: String },
    /// Project export paths out of a response body file, without calling the API
    Project {
        #[arg(long)]
        body: PathBuf,
        #[arg(long = "export")]
        exports: Vec<String>,
    },
    /// Persist the Resource Manager endpoint in the config file
    SetEndpoint { endpoint: String },
}

/// Well-known fields given on the command line, applied over the file
#[derive(clap::Args, Debug, Clone)]
struct Overrides {
    /// Resource location
    #[arg(long)]
    location: Option<String>,
    /// Resource tag as key=value, may be repeated
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
}

impl Overrides {
    fn apply(&self, resource: &mut ResourceConfig) {
        if let Some(location) = &self.location {
            resource.location = Some(location.clone());
        }
        if !self.tags.is_empty() {
            resource
                .tags
                .get_or_insert_with(Default::default)
                .extend(self.tags.iter().cloned());
        }
    }
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
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
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("armgen {} started with log level: {:?}", armgen::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("armgen").join("armgen.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".armgen").join("armgen.log");
    }
    PathBuf::from("armgen.log")
}

/// Load a JSON or YAML document, chosen by file extension
fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML {:?}", path))
        }
        _ => serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON {:?}", path)),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_context(args: &Args, config: &Config) -> Result<ProviderContext> {
    let endpoint = config.effective_endpoint(args.endpoint.as_deref());
    let credentials = match &args.token {
        Some(token) => ArmCredentials::with_token(token.as_str()),
        None => ArmCredentials::from_env(),
    };

    let client = ResourceClient::new(&endpoint, credentials)?
        .with_poll_interval(config.poll_interval());
    tracing::info!("Using endpoint: {}", client.endpoint());
    Ok(ProviderContext::new(client, config.timeouts))
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    match &args.command {
        Command::ParseId { id } => {
            let id = ResourceId::parse(id)?;
            print_json(&json!({
                "id": id.id(),
                "azure_resource_id": id.azure_resource_id(),
                "name": id.name(),
                "parent_id": id.parent_id(),
                "type": id.resource_type().to_string(),
                "api_version": id.api_version(),
            }))
        }
        Command::Project { body, exports } => {
            let body: Value = load_document(body)?;
            print_json(&project(&body, exports))
        }
        Command::SetEndpoint { endpoint } => {
            // Validate before persisting
            let _ = ResourceClient::new(endpoint, ArmCredentials::anonymous())?;
            config.set_endpoint(endpoint)?;
            println!("Endpoint set to {}", endpoint);
            Ok(())
        }
        Command::Read {
            name,
            parent_id,
            resource_type,
            exports,
        } => {
            let ctx = build_context(&args, &config)?;
            let data_source = DataSourceConfig {
                name: name.clone(),
                parent_id: parent_id.clone(),
                resource_type: resource_type.clone(),
                response_export_values: exports.clone(),
            };
            print_json(&lifecycle::read_data_source(&ctx, &data_source).await?)
        }
        Command::Create { file, overrides } => {
            let ctx = build_context(&args, &config)?;
            let mut resource: ResourceConfig = load_document(file)?;
            overrides.apply(&mut resource);
            print_json(&lifecycle::create(&ctx, &resource).await?)
        }
        Command::Update { file, overrides } => {
            let ctx = build_context(&args, &config)?;
            let mut resource: ResourceConfig = load_document(file)?;
            overrides.apply(&mut resource);
            print_json(&lifecycle::update(&ctx, &resource).await?)
        }
        Command::Show { id, exports } => {
            let ctx = build_context(&args, &config)?;
            match lifecycle::read(&ctx, id, exports).await? {
                Some(state) => print_json(&state),
                None => anyhow::bail!("{} does not exist", id),
            }
        }
        Command::Delete { id } => {
            let ctx = build_context(&args, &config)?;
            lifecycle::delete(&ctx, id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
        Command::Import { id, exports } => {
            let ctx = build_context(&args, &config)?;
            print_json(&lifecycle::import(&ctx, id, exports).await?)
        }
    }
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level)?;

    let result = run(args).await;
    if let Err(err) = &result {
        tracing::error!("{:?}", err);
        eprintln!("Error: {}", format_arm_error(err));
    }

    // Flush the log writer before exiting
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}
