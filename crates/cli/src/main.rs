use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use projdev_core::{ProjectRequest, Settings};
use projdev_provider_anthropic::AnthropicExpander;
use projdev_provider_github::GithubProvisioner;
use projdev_provider_notion::NotionPublisher;
use projdev_server::{Pipeline, Server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

type AppPipeline = Pipeline<AnthropicExpander, GithubProvisioner, NotionPublisher>;

#[derive(Parser, Debug)]
#[command(
    name = "projdev",
    version,
    about = "MCP server that turns a project idea into a GitHub repository and Notion page"
)]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the MCP tools over HTTP (Streamable HTTP and SSE) or stdio.
    Serve(ServeArgs),
    /// Run the pipeline once and print the report as JSON.
    Develop(DevelopArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = false)]
    stdio: bool,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct DevelopArgs {
    #[arg(long)]
    idea: String,
    #[arg(long = "project-name")]
    project_name: String,
    #[arg(long = "no-notion", default_value_t = false)]
    no_notion: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let settings = load_settings(cli.config.as_deref())?;
    match cli.command {
        Commands::Serve(args) => serve(args, settings).await?,
        Commands::Develop(args) => develop_cmd(args, &settings).await?,
    }
    Ok(())
}

async fn serve(args: ServeArgs, mut settings: Settings) -> Result<()> {
    if let Some(host) = args.host {
        settings.serve.host = host;
    }
    if let Some(port) = args.port {
        settings.serve.port = port;
    }
    info!(stdio = args.stdio, "starting server");
    let server = Server::new(build_pipeline(&settings)?);
    if args.stdio {
        if let Err(e) = server.run_stdio().await {
            tracing::error!(error=%e, "stdio server exited with error");
            return Err(eyre!("stdio server failed: {}", e));
        }
    } else if let Err(e) = server.run_http(&settings.serve.addr()).await {
        tracing::error!(error=%e, "http server exited with error");
        return Err(eyre!("http server failed: {}", e));
    }
    Ok(())
}

async fn develop_cmd(args: DevelopArgs, settings: &Settings) -> Result<()> {
    let pipeline = build_pipeline(settings)?;
    let request = ProjectRequest::new(args.idea, args.project_name).with_page(!args.no_notion);
    let report = pipeline
        .develop(&request)
        .await
        .map_err(|e| eyre!("develop failed ({}): {}", e.code(), e))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn build_pipeline(settings: &Settings) -> Result<AppPipeline> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| eyre!("http client error: {}", e))?;
    let publisher = NotionPublisher::new(http.clone(), &settings.notion);
    if !publisher.is_configured() {
        info!("NOTION_API_KEY or NOTION_DATABASE_ID missing; project pages will be skipped");
    }
    Ok(Pipeline::new(
        AnthropicExpander::new(http.clone(), &settings.anthropic),
        GithubProvisioner::new(http, &settings.github),
        publisher,
    ))
}

/// Defaults, then the optional config file, then `PROJDEV__SECTION__KEY`
/// overrides, then the well-known bare variables such as `GITHUB_TOKEN`.
fn load_settings(path: Option<&str>) -> Result<Settings> {
    let mut builder = config::Config::builder();
    if let Some(raw) = path {
        let expanded = expand_path(raw);
        if !expanded.exists() {
            tracing::warn!(
                path = expanded.display().to_string(),
                "config file not found; continuing with defaults and env overrides"
            );
        }
        builder = builder.add_source(config::File::from(expanded).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("PROJDEV").separator("__"));

    let cfg = builder
        .build()
        .map_err(|e| eyre!("config load error: {}", e))?;
    let mut settings: Settings = cfg
        .try_deserialize()
        .map_err(|e| eyre!("config parse error: {}", e))?;
    settings
        .apply_lookup(|key| std::env::var(key).ok())
        .map_err(|e| eyre!("config parse error: {}", e))?;
    Ok(settings)
}

fn expand_path(input: &str) -> PathBuf {
    if input == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from(input));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return home_dir()
            .map(|mut base| {
                base.push(rest);
                base
            })
            .unwrap_or_else(|| PathBuf::from(rest));
    }
    PathBuf::from(input)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
}
