use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sign_lens::{
    PredictionResponse, SignService,
    config::{ServiceConfig, default_labels_path, default_model_path},
    server::{self, AppState},
};

/// Sign-language word recognition from images and short clips
#[derive(Parser, Debug)]
#[command(name = "sign-lens", version, about)]
struct Cli {
    /// ONNX classifier
    #[arg(long, env = "SIGN_LENS_MODEL", default_value_os_t = default_model_path())]
    model: PathBuf,

    /// JSON label vocabulary, in classifier output order
    #[arg(long, env = "SIGN_LENS_LABELS", default_value_os_t = default_labels_path())]
    labels: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = 5001)]
        port: u16,

        /// Where uploaded videos are spooled while they are decoded
        #[arg(long, env = "SIGN_LENS_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,
    },
    /// Classify one image file
    Image { path: PathBuf },
    /// Classify a video or animated image file
    Video { path: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = ServiceConfig {
        model_path: cli.model,
        labels_path: cli.labels,
        ..ServiceConfig::default()
    };
    if let Command::Serve { upload_dir, .. } = &cli.command {
        config.upload_dir = upload_dir.clone();
    }

    let service = SignService::from_config(&config).with_context(|| {
        format!(
            "failed to initialize classifier from {} and {}",
            config.model_path.display(),
            config.labels_path.display()
        )
    })?;

    match cli.command {
        Command::Serve { host, port, .. } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid listen address {host}:{port}"))?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(addr, AppState::new(service, config.upload_dir)))
        }
        Command::Image { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let prediction = service.predict_image_bytes(&bytes)?;
            print_prediction(prediction.into())
        }
        Command::Video { path } => {
            let prediction = service.predict_video_path(&path)?;
            log::info!(
                "decided on {} frame(s), mean confidence {:.2}",
                prediction.frames,
                prediction.confidence
            );
            print_prediction(prediction.into())
        }
    }
}

fn print_prediction(response: PredictionResponse) -> Result<()> {
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
