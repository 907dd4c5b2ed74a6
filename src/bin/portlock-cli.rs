use clap::{Parser, Subcommand};
use portlock::ports::{build_finder, FinderStrategy, LocalPortCheck, PortRange};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::net::IpAddr;

#[derive(Parser)]
#[command(name = "portlock-cli")]
#[command(about = "Port discovery and admin CLI for portlock services", long_about = None)]
struct Cli {
    /// Admin connector base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key, sent as a bearer token
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find an application/admin port pair on this host
    Find {
        #[arg(long)]
        min: u16,
        #[arg(long)]
        max: u16,
        #[arg(long, value_enum, default_value = "random")]
        strategy: Strategy,
        /// Address to check
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },
    /// Check service status
    Status,
    /// List the ports a service bound
    Ports,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Strategy {
    Random,
    Incrementing,
    Adjacent,
}

impl From<Strategy> for FinderStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Random => FinderStrategy::Random,
            Strategy::Incrementing => FinderStrategy::Incrementing,
            Strategy::Adjacent => FinderStrategy::Adjacent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Find {
            min,
            max,
            strategy,
            host,
        } => {
            let range = PortRange::new(min, max)?;
            let finder = build_finder(strategy.into(), LocalPortCheck::new(host));
            let ports = finder.find(&range)?;
            println!("{}", serde_json::to_string_pretty(&ports)?);
            return Ok(());
        }
        Commands::Status => "/admin/status",
        Commands::Ports => "/admin/ports",
    };

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
