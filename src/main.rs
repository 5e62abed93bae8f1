use anyhow::Context;
use clap::Parser;
use httpmoq::config::Command;
use httpmoq::utils::error::ErrorCategory;
use httpmoq::utils::{logger, validation::Validate};
use httpmoq::{BodyReader, CliConfig, HttpClient, ReqwestClient, TomlConfig};

async fn run(client: &dyn HttpClient, command: Command) -> httpmoq::Result<reqwest::Response> {
    match command {
        Command::Get { url } => client.get(&url).await,
        Command::Head { url } => client.head(&url).await,
        Command::Post {
            url,
            content_type,
            data,
            file,
        } => {
            let body: BodyReader = match (data, file) {
                (Some(data), _) => Box::new(std::io::Cursor::new(data.into_bytes())),
                (None, Some(path)) => Box::new(tokio::fs::File::open(path).await?),
                (None, None) => Box::new(tokio::io::stdin()),
            };
            client.post(&url, &content_type, body).await
        }
        Command::Form { url, fields } => client.post_form(&url, &fields).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match &cli.config {
        Some(path) => TomlConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TomlConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    if config.log_json() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli);

    let client = ReqwestClient::from_config(config.client.clone())?;
    let is_head = matches!(cli.command, Command::Head { .. });

    let result = run(&client, cli.command).await;
    client.close_idle_connections();

    match result {
        Ok(response) => {
            println!("{:?} {}", response.version(), response.status());
            if cli.include_headers || is_head {
                for (name, value) in response.headers() {
                    println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
                }
            }
            if !is_head {
                let body = response.text().await?;
                println!();
                println!("{}", body);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Request failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.category() {
                ErrorCategory::Usage => 2,
                ErrorCategory::Configuration => 3,
                ErrorCategory::Transport => 4,
                ErrorCategory::Request => 5,
            };
            std::process::exit(exit_code);
        }
    }
}
