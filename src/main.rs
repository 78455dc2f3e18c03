//! Command-line access to the dashboard API.
//!
//! Every subcommand goes through `ApiClient`, so calls carry the stored
//! bearer token, get a fresh X-Request-ID and recover from an expired
//! access token the same way the library does for any other caller.
//! Reads (`get`, `download`) are retried per `[retries]`; writes run once.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use dashboard_client::api::error::FALLBACK_STATUS;
use dashboard_client::api::{ApiError, ApiResponse, ErrorKind, FilePart};
use dashboard_client::auth::service::LoginRequest;
use dashboard_client::config::{self, ClientConfig, RetrySettings};
use dashboard_client::observability::logging;
use dashboard_client::resilience::{retry, RetryConfig};
use dashboard_client::services::{CommonService, UserFilters, UserService};
use dashboard_client::{ApiClient, AuthService};

#[derive(Parser)]
#[command(name = "dashboard-cli")]
#[command(about = "Command-line client for the admin dashboard API", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API base address
    #[arg(short = 'u', long)]
    base_url: Option<String>,

    /// JSON file holding the credential pair between runs
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Retry failed reads (get, download) this many times; writes are never retried
    #[arg(long)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a resource
    Get { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// DELETE a resource
    Delete { path: String },
    /// Upload a file as multipart content
    Upload { path: String, file: PathBuf },
    /// Download a file into the download directory
    Download {
        path: String,
        #[arg(short, long)]
        filename: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Sign in and persist the credential pair
    Login { email: String, password: String },
    /// Sign out and drop the credential pair
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// List users
    Users {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Check API health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(path) = cli.credentials {
        config.credentials.store_path = Some(path);
    }
    if let Some(retries) = cli.retries {
        config.retries.max_retries = retries;
    }
    if let Commands::Download {
        output_dir: Some(dir),
        ..
    } = &cli.command
    {
        config.api.download_dir = dir.clone();
    }

    logging::init(&config.observability.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {}", e.summary());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), ApiError> {
    let client = ApiClient::from_config(config)?;
    let policy = retry_policy(&command, &config.retries);

    match command {
        Commands::Get { path } => {
            let res: ApiResponse<Value> = retry(&policy, || client.get(&path)).await?;
            print_response(&res)
        }
        Commands::Post { path, data } => {
            let body = parse_body(data.as_deref())?;
            let res: ApiResponse<Value> = retry(&policy, || client.post(&path, &body)).await?;
            print_response(&res)
        }
        Commands::Put { path, data } => {
            let body = parse_body(data.as_deref())?;
            let res: ApiResponse<Value> = retry(&policy, || client.put(&path, &body)).await?;
            print_response(&res)
        }
        Commands::Patch { path, data } => {
            let body = parse_body(data.as_deref())?;
            let res: ApiResponse<Value> = retry(&policy, || client.patch(&path, &body)).await?;
            print_response(&res)
        }
        Commands::Delete { path } => {
            let res: ApiResponse<Value> = retry(&policy, || client.delete(&path)).await?;
            print_response(&res)
        }
        Commands::Upload { path, file } => {
            let part = FilePart::from_path(&file)
                .await
                .map_err(|e| ApiError::io(&e))?;
            let res: ApiResponse<Value> = client.upload(&path, part).await?;
            print_response(&res)
        }
        Commands::Download { path, filename, .. } => {
            let saved = retry(&policy, || client.download(&path, filename.as_deref())).await?;
            println!("{}", saved.display());
            Ok(())
        }
        Commands::Login { email, password } => {
            let auth = AuthService::new(client);
            let res = auth.login(&LoginRequest { email, password }).await?;
            let user = res.into_data()?.user;
            println!("Signed in as {} <{}> ({})", user.name, user.email, user.role);
            Ok(())
        }
        Commands::Logout => {
            AuthService::new(client).logout().await?;
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            let auth = AuthService::new(client);
            let res = retry(&policy, || auth.profile()).await?;
            print_response(&res)
        }
        Commands::Users {
            page,
            limit,
            search,
        } => {
            let users = UserService::new(client);
            let filters = UserFilters {
                page,
                limit,
                search,
                ..Default::default()
            };
            let page = retry(&policy, || users.list(&filters)).await?;
            let json = serde_json::to_string_pretty(&page).map_err(output_error)?;
            println!("{}", json);
            Ok(())
        }
        Commands::Health => {
            let common = CommonService::new(client, &config.cache);
            let res = retry(&policy, || common.health()).await?;
            print_response(&res)
        }
    }
}

/// Configured retries for reads; none for anything that changes server state.
fn retry_policy(command: &Commands, settings: &RetrySettings) -> RetryConfig {
    let policy = RetryConfig::from(settings);
    match command {
        Commands::Get { .. }
        | Commands::Download { .. }
        | Commands::Whoami
        | Commands::Users { .. }
        | Commands::Health => policy,
        _ => RetryConfig {
            max_retries: 0,
            ..policy
        },
    }
}

fn parse_body(data: Option<&str>) -> Result<Value, ApiError> {
    match data {
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                400,
                format!("--data is not valid JSON: {}", e),
            )
        }),
        None => Ok(Value::Null),
    }
}

fn print_response<T: serde::Serialize>(res: &ApiResponse<T>) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(res).map_err(output_error)?;
    println!("{}", json);
    Ok(())
}

fn output_error(e: serde_json::Error) -> ApiError {
    ApiError::new(ErrorKind::InvalidRequest, FALLBACK_STATUS, e.to_string())
}
