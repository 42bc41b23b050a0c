use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use longscribe::cli::{Cli, Commands, ConfigAction};
use longscribe::config::Config;
use longscribe::defaults::POLL_INTERVAL_MS;
use longscribe::output::{
    clear_line, format_fragment, format_plan, format_summary, render_progress,
};
use longscribe::{
    CommandEngine, Coordinator, FfmpegProducer, SessionState, SessionStatus, SessionStore,
    SourceMedia, SubmitRequest, plan, requires_segmentation,
};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    longscribe::logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Transcribe {
            file,
            model,
            duration,
            json,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = TranscribeOptions {
                model,
                duration,
                json,
                output,
                quiet: cli.quiet,
            };
            handle_transcribe(config, &file, options).await?;
        }
        Commands::Probe { file } => {
            let config = load_config(cli.config.as_deref())?;
            handle_probe(&config, &file).await?;
        }
        Commands::Plan {
            duration,
            segment_length,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let length =
                segment_length.unwrap_or(config.segmenter.segment_length_secs as f64);
            print_plan(duration, length)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "longscribe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from a custom path or the default location.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        let default_path = Config::default_path()?;
        Config::load_or_default(&default_path)?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

struct TranscribeOptions {
    model: Option<String>,
    duration: Option<f64>,
    json: bool,
    output: Option<PathBuf>,
    quiet: bool,
}

/// Run one session to completion, rendering progress on stderr.
async fn handle_transcribe(config: Config, file: &Path, options: TranscribeOptions) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Input file not found: {}", file.display());
    }

    let producer = Arc::new(FfmpegProducer::from_config(&config.segmenter));
    let duration = match options.duration {
        Some(duration) => duration,
        None => producer
            .probe_duration(file)
            .await
            .with_context(|| format!("Failed to probe {}", file.display()))?,
    };
    let segment_length = config.segmenter.segment_length_secs as f64;
    if !requires_segmentation(duration, segment_length) {
        tracing::info!(duration_secs = duration, "input fits in a single segment");
    }

    let model = options.model.unwrap_or_else(|| config.engine.model.clone());
    let engine = Arc::new(CommandEngine::from_config(&config.engine));
    let coordinator = Coordinator::new(
        Arc::new(SessionStore::new()),
        producer,
        engine,
        config.pipeline_config(),
    );

    let handle = coordinator.submit(SubmitRequest::new(
        SourceMedia::borrowed(file),
        model,
        duration,
    ));
    let session_id = handle.id().to_string();
    let live = !options.quiet && !options.json;
    let color = std::io::stderr().is_terminal();

    let mut ticker = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
    let mut shown = 0;
    let mut cancel_requested = false;
    let wait = handle.wait();
    tokio::pin!(wait);

    let status = loop {
        tokio::select! {
            status = &mut wait => break status,
            signal = tokio::signal::ctrl_c(), if !cancel_requested => {
                signal.context("Failed to listen for Ctrl-C")?;
                cancel_requested = true;
                coordinator.cancel(&session_id);
                clear_line();
                eprintln!("{}", "Cancelling after the current segment...".yellow());
            }
            _ = ticker.tick() => {
                if live && let Some(state) = coordinator.poll_progress(&session_id) {
                    shown = render_live(&state, shown, color);
                }
            }
        }
    };

    let final_state = coordinator.poll_progress(&session_id);
    if live {
        if let Some(state) = &final_state {
            render_live(state, shown, color);
        }
        clear_line();
    }

    match (status, final_state) {
        (SessionStatus::Completed, Some(state)) => {
            if options.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                let transcript = state.final_transcript.clone().unwrap_or_default();
                match &options.output {
                    Some(path) => {
                        std::fs::write(path, format!("{transcript}\n"))
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        if !options.quiet {
                            eprintln!("Transcript written to {}", path.display());
                        }
                    }
                    None => println!("{transcript}"),
                }
            }
            if !options.quiet {
                eprintln!("{} {}", "✓".green(), format_summary(&state));
            }
            Ok(())
        }
        (SessionStatus::Cancelled, _) => {
            eprintln!("{}", "Transcription cancelled".yellow());
            std::process::exit(130);
        }
        (_, Some(state)) => {
            if options.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            eprintln!("{} {}", "Error:".red(), format_summary(&state));
            std::process::exit(1);
        }
        (status, None) => {
            eprintln!("{} session ended as {} with no state", "Error:".red(), status);
            std::process::exit(1);
        }
    }
}

/// Print fragments not shown yet, then the progress line. Returns the new count.
fn render_live(state: &SessionState, shown: usize, color: bool) -> usize {
    if state.fragments.len() > shown {
        clear_line();
        for fragment in &state.fragments[shown..] {
            eprintln!("{}", format_fragment(fragment, color));
        }
    }
    if !state.is_terminal() {
        render_progress(state, color);
    }
    state.fragments.len()
}

async fn handle_probe(config: &Config, file: &Path) -> Result<()> {
    let producer = FfmpegProducer::from_config(&config.segmenter);
    let duration = producer
        .probe_duration(file)
        .await
        .with_context(|| format!("Failed to probe {}", file.display()))?;

    println!(
        "Duration: {:.3}s ({})",
        duration,
        humantime::format_duration(Duration::from_secs(duration as u64))
    );
    print_plan(duration, config.segmenter.segment_length_secs as f64)
}

fn print_plan(duration: f64, segment_length: f64) -> Result<()> {
    let windows = plan(duration, segment_length)?;
    println!(
        "{} segment(s) of {}s",
        windows.len().bold(),
        segment_length
    );
    for line in format_plan(&windows) {
        println!("{line}");
    }
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = match custom_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };

    match action {
        ConfigAction::Path => {
            let marker = if config_path.exists() {
                "".to_string()
            } else {
                format!(" {}", "(not created yet)".dimmed())
            };
            println!("{}{}", config_path.display(), marker);
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
