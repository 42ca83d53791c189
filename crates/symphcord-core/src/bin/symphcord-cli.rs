use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use symphcord_core::{
    AppConfig, Engine, EngineError,
    diagnostics::init_tracing_from_config,
    fixtures::demo_batch,
    generate_render_report,
    midi::score_midi_bytes,
    persistence::{load_batch, save_batch, write_atomic},
    report::write_render_report,
};

#[derive(Debug, Parser)]
#[command(name = "symphcord-cli")]
#[command(about = "Offline tools for turning chat message batches into short compositions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file; defaults to symphcord.config.toml discovery.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Overrides the configured SoundFont.
    #[arg(long)]
    soundfont: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a JSON message batch to WAV.
    Compose {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "data/exports/composition.wav")]
        output: PathBuf,

        #[arg(long)]
        midi: Option<PathBuf>,

        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Render the built-in demo conversation.
    Demo {
        #[arg(long, default_value = "data/exports")]
        output_dir: PathBuf,
    },
    /// Print the render report of a batch as JSON.
    Report {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "data/reports/render.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from_path(path)?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load()?,
    };
    if let Some(log_dir) = cli.log_dir {
        config.diagnostics.logs_dir = log_dir;
    }
    if let Some(soundfont) = cli.soundfont {
        config.soundfont.path = Some(soundfont);
    }
    let _telemetry = init_tracing_from_config(&config.diagnostics)?;
    let engine = Engine::new(config);

    match cli.command {
        Commands::Compose {
            input,
            output,
            midi,
            report,
        } => {
            let batch = load_batch(&input)?;
            let composition = match engine.compose(&batch) {
                Ok(composition) => composition,
                Err(EngineError::EmptyInput) => {
                    tracing::warn!("nothing melodic to build yet; batch was empty");
                    return Ok(());
                }
                Err(error) => return Err(error).context("failed to render composition"),
            };

            write_atomic(&output, &composition.wav)?;
            if let Some(midi) = midi {
                let bytes = score_midi_bytes(&composition.score, &composition.voices)?;
                write_atomic(&midi, &bytes)?;
            }
            if let Some(report) = report {
                write_render_report(&report, &generate_render_report(&composition)?)?;
            }
            tracing::info!(
                path = %output.display(),
                notes = composition.score.notes.len(),
                seconds = composition.clip.total_duration.as_secs_f64(),
                "composition written"
            );
        }
        Commands::Demo { output_dir } => {
            let batch = demo_batch();
            save_batch(&output_dir.join("demo.batch.json"), &batch)?;
            let composition = engine
                .compose(&batch)
                .context("failed to render demo composition")?;

            write_atomic(&output_dir.join("demo.wav"), &composition.wav)?;
            let midi = score_midi_bytes(&composition.score, &composition.voices)?;
            write_atomic(&output_dir.join("demo.mid"), &midi)?;
            write_render_report(
                &output_dir.join("demo.report.json"),
                &generate_render_report(&composition)?,
            )?;
            tracing::info!(path = %output_dir.display(), "demo exported");
        }
        Commands::Report { input, output } => {
            let batch = load_batch(&input)?;
            let composition = engine
                .compose(&batch)
                .context("failed to render composition")?;
            let report = generate_render_report(&composition)?;
            write_render_report(&output, &report)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
