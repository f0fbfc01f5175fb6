use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vital_monitor::collector::{parse_assignment, read_csv_window, read_json_window, window_request};
use vital_monitor::{
    frame_channel, ClientConfig, FormCollector, Orchestrator, Outcome, PredictionClient, WaveformConfig,
    WaveformRenderer, API_BASE_ENV, TIMEOUT_ENV,
};

#[derive(Parser)]
#[command(name = "vital-monitor", about = "Patient vital-sign prediction client")]
struct Cli {
    /// Base address of the prediction service
    #[arg(long, env = API_BASE_ENV)]
    api_base: Option<String>,

    /// Request timeout in seconds (transport default when unset)
    #[arg(long, env = TIMEOUT_ENV)]
    timeout_secs: Option<u64>,

    /// Waveform frames to print after the result
    #[arg(long, default_value_t = 3)]
    frames: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict from one record: the default form plus any overrides
    Single {
        /// NAME=VALUE, repeatable
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Predict from a window of 7 to 10 recent records
    Window {
        #[arg(long, conflicts_with = "json", required_unless_present = "json")]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Show a locally synthesized result without calling the service
    Demo,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(base) = cli.api_base {
        config = config.with_base_url(base);
    }
    if cli.timeout_secs.is_some() {
        config.timeout_seconds = cli.timeout_secs;
    }

    let client = Arc::new(PredictionClient::new(&config).context("failed to create prediction client")?);
    let waveform_config = WaveformConfig::default();
    let height = waveform_config.height;
    let (frame_sender, mut frames) = frame_channel();
    let renderer = WaveformRenderer::new(waveform_config, frame_sender);
    let mut monitor = Orchestrator::new(client, renderer);

    let request = match cli.command {
        Command::Demo => None,
        Command::Single { fields } => {
            let mut form = FormCollector::new();
            for assignment in &fields {
                let (name, value) = parse_assignment(assignment)?;
                form.set(name, value);
            }
            Some(form.single_request()?)
        }
        Command::Window { csv, json } => {
            let payload = match (csv, json) {
                (Some(path), _) => read_csv_window(&path)
                    .await
                    .with_context(|| format!("failed to load {}", path.display()))?,
                (None, Some(path)) => read_json_window(&path)
                    .await
                    .with_context(|| format!("failed to load {}", path.display()))?,
                (None, None) => anyhow::bail!("either --csv or --json is required"),
            };
            Some(window_request(payload)?)
        }
    };

    match request {
        None => monitor.predict_offline()?,
        Some(request) => {
            monitor.submit(request)?;
            match monitor.next_outcome().await {
                Some(Outcome::Applied { ticket }) => info!("Prediction {} applied", ticket.id),
                Some(outcome) => error!("Prediction not applied: {:?}", outcome),
                None => {}
            }
        }
    }

    let view = monitor.snapshot();
    if let Some(error) = view.error {
        println!("Prediction failed ({:?}): {}", error.kind, error.message);
    }
    if let Some(grid) = view.grid {
        println!("Prediction Result");
        print!("{}", grid);
    }
    if let Some(result) = view.result {
        println!("\nEstimated BPM: {} bpm", result.heart_rate());
        for _ in 0..cli.frames {
            if frames.changed().await.is_err() {
                break;
            }
            if let Some(frame) = frames.borrow_and_update().as_ref() {
                println!("{}\n", frame.to_ascii(65, 10, height));
            }
        }
    }

    monitor.teardown();
    Ok(())
}
