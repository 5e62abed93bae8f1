use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "httpmoq")]
#[command(about = "Issue HTTP requests through the httpmoq client")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "TOML file with [client] settings")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print response headers")]
    pub include_headers: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// GET a URL and print the body
    Get { url: String },
    /// HEAD a URL and print the status
    Head { url: String },
    /// POST a body read from --data, --file or stdin
    Post {
        url: String,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// POST url-encoded form fields
    Form {
        url: String,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

impl Command {
    pub fn url(&self) -> &str {
        match self {
            Command::Get { url }
            | Command::Head { url }
            | Command::Post { url, .. }
            | Command::Form { url, .. } => url,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}
