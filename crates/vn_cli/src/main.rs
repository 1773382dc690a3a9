use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vn_core::{Error, ImageAttachment, ImpactStatsSource, Result, VerificationRequest};
use vn_inference::{create_model, Verifier};
use vn_storage::{create_backends, Backends, StorageConfig};
use vn_web::{create_app, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "News claim verification service", long_about = None)]
pub struct Cli {
    #[arg(long, env = "VN_STORAGE", default_value = "supabase", help = "Storage backend: supabase (default), memory (records are lost on exit), sqlite")]
    storage: String,
    #[arg(long, env = "VN_MODEL", default_value = "gemini", help = "Model to use for verification: gemini (default), dummy")]
    model: String,
    #[arg(long, env = "VN_MODEL_URL")]
    model_url: Option<String>,
    #[arg(long, env = "VN_MODEL_NAME")]
    model_name: Option<String>,
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,
    #[arg(long, env = "VN_DB_PATH")]
    db_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the verification API over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Verify a single claim and print the stored record
    Verify {
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Path to an image to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Print the aggregate impact counters
    Stats,
}

impl Cli {
    fn inference_config(&self) -> vn_inference::Config {
        vn_inference::Config {
            model: self.model.clone(),
            api_key: self.google_api_key.clone(),
            model_name: self.model_name.clone(),
            model_url: self.model_url.clone(),
            ..vn_inference::Config::default()
        }
    }

    fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            url: self.supabase_url.clone(),
            service_key: self.supabase_key.clone(),
            path: self.db_path.clone(),
            ..StorageConfig::default()
        }
    }
}

fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

fn build_verifier(cli: &Cli, backends: &Backends) -> Result<Verifier> {
    let model = create_model(cli.inference_config())?;
    info!("🧠 Inference model initialized successfully (using {})", model.name());
    Ok(Verifier::new(model, backends.records.clone(), backends.images.clone()))
}

async fn build_state(cli: &Cli) -> AppState {
    info!("💾 Checking storage configuration...");
    let backends = create_backends(&cli.storage, &cli.storage_config()).await;
    let (verifier, stats) = match &backends {
        Ok(backends) => {
            info!("✨ Storage initialized successfully (using {})", backends.name);
            (build_verifier(cli, backends), Ok(backends.stats.clone()))
        }
        Err(e) => {
            error!("⚠️ Storage is unavailable: {}", e);
            (
                Err(Error::Configuration(e.to_string())),
                Err(Error::Configuration(e.to_string())),
            )
        }
    };

    if let Err(e) = &verifier {
        error!("⚠️ Verification is unavailable: {}", e);
    }
    AppState::from_parts(verifier, stats)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

async fn serve(cli: &Cli, host: &str, port: u16) -> Result<()> {
    let app = create_app(build_state(cli).await);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("🚀 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn verify_once(
    cli: &Cli,
    content: Option<String>,
    url: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let backends = create_backends(&cli.storage, &cli.storage_config()).await?;
    let verifier = build_verifier(cli, &backends)?;

    let mut request = VerificationRequest {
        content,
        url,
        image: None,
    };
    if let Some(path) = image {
        let bytes = tokio::fs::read(&path).await?;
        let mut attachment = ImageAttachment::new(bytes, image_content_type(&path));
        attachment.file_name = path.file_name().map(|name| name.to_string_lossy().into_owned());
        request.image = Some(attachment);
    }

    let record = verifier.verify(&request).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn print_stats(stats: Arc<dyn ImpactStatsSource>) -> Result<()> {
    let stats = stats.current_stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { host, port } => serve(&cli, host, *port).await,
        Commands::Verify { content, url, image } => {
            verify_once(&cli, content.clone(), url.clone(), image.clone()).await
        }
        Commands::Stats => {
            let backends = create_backends(&cli.storage, &cli.storage_config()).await?;
            print_stats(backends.stats).await
        }
    }
}
