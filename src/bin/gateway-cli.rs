use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the node REST gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8500")]
    url: String,

    /// API key, when the gateway runs the "api-key" security scheme.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the node identity document
    Info,
    /// List every routed API endpoint
    Definition,
    /// Show the JSON schema of a type, or list known types
    Schema {
        /// Type name; omit to list all known types
        type_name: Option<String>,
    },
    /// Fetch records of a type from a module
    Records {
        module: String,
        type_name: String,
        /// Optional record key filter
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))?,
        );
    }

    let path = match &cli.command {
        Commands::Info => "/node/info".to_string(),
        Commands::Definition => "/api/definition".to_string(),
        Commands::Schema { type_name } => match type_name {
            Some(name) => format!("/api/schema/{name}"),
            None => "/api/schema/".to_string(),
        },
        Commands::Records {
            module,
            type_name,
            key,
        } => match key {
            Some(key) => format!("/node/{module}/records/{type_name}/{key}"),
            None => format!("/node/{module}/records/{type_name}"),
        },
    };

    let res = client
        .get(format!("{}{}", cli.url, path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
