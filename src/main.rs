use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::sync::Arc;

use eyre::{Context, Result, bail};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, Command, OutputFormat};
use studyx::chat::{ChatAnswer, ChatRequest};
use studyx::config::Config;
use studyx::service::StudyService;
use studyx::study::StudyBundle;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("studyx.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyx")
        .join("logs")
}

fn tool_version(name: &str) -> Option<String> {
    Process::new(name)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let yt_dlp_line = match tool_version("yt-dlp") {
        Some(v) => format!("  \x1b[32m✅\x1b[0m yt-dlp     {v}"),
        None => "  \x1b[31m❌\x1b[0m yt-dlp     (not found, last-resort caption source disabled)".to_string(),
    };

    let log_path = log_dir().join("studyx.log");

    format!(
        "\nOPTIONAL TOOLS:\n{yt_dlp_line}\n\nConfig is read from: {}\nLogs are written to: {}",
        studyx::config::config_path().display(),
        log_path.display()
    )
}

fn load_config(cli: &Cli) -> Config {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!("Ignoring unreadable config: {e}");
        Config::default()
    });
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    debug!("Effective config: {config:?}");
    config
}

fn read_text_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn render_bundle(bundle: &StudyBundle, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => studyx::output::render_text(bundle),
        OutputFormat::Json => studyx::output::render_json(bundle),
        OutputFormat::Markdown => studyx::output::render_markdown(bundle),
    }
}

fn render_answer(answer: &ChatAnswer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(answer).unwrap_or_else(|_| answer.answer.clone()),
        OutputFormat::Text | OutputFormat::Markdown => answer.answer.clone(),
    }
}

fn render_transcript(url: &str, text: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({ "url": url, "transcript": text }).to_string(),
        OutputFormat::Text | OutputFormat::Markdown => text.to_string(),
    }
}

fn emit(cli: &Cli, rendered: &str) -> Result<()> {
    if let Some(ref path) = cli.output {
        std::fs::write(path, rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    let mut config = load_config(&cli);
    let client = reqwest::Client::new();
    let service = StudyService::from_config(client, &config);
    let api_key = cli.api_key.as_deref();

    if cli.verbose {
        let config_path = cli.config.clone().unwrap_or_else(studyx::config::config_path);
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {}", config.model);
        eprintln!("Transcript providers: {}", service.provider_names().join(" -> "));
    }

    let rendered = match &cli.command {
        Command::Video { url } => {
            let bundle = service.analyze_url(api_key, url).await?;
            render_bundle(&bundle, cli.format)
        }
        Command::Text { file } => {
            let text = read_text_input(file.as_deref())?;
            let bundle = service.analyze_text(api_key, &text).await?;
            render_bundle(&bundle, cli.format)
        }
        Command::Document { path } => {
            let bytes = std::fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))?;
            let bundle = service.analyze_document(api_key, &bytes).await?;
            render_bundle(&bundle, cli.format)
        }
        Command::Chat {
            question,
            material,
            context,
        } => {
            let full_content = match material {
                Some(path) => read_text_input(Some(path))?,
                None => String::new(),
            };
            let request = ChatRequest {
                context: context.clone(),
                question: question.clone(),
                full_content,
            };
            let answer = service.chat(api_key, &request).await?;
            render_answer(&answer, cli.format)
        }
        Command::Transcript { url } => {
            let text = service.transcript(url).await?;
            if cli.verbose {
                eprintln!("Transcript: {} characters", text.as_str().chars().count());
            }
            render_transcript(url, text.as_str(), cli.format)
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind.clone();
            }
            if config.bind.is_empty() {
                bail!("no listen address configured");
            }
            eprintln!("Serving on http://{}", config.bind);
            studyx::server::serve(Arc::new(service), &config).await?;
            return Ok(());
        }
    };

    emit(&cli, &rendered)
}
