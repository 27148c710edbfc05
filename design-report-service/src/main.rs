use design_report_service::create_app;
use report_flow::GeneratorConfig;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Provider selection and credentials are required up front
    let config = match GeneratorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let app = create_app(&config);
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let addr = listener.local_addr()?;

    info!("Design Report Service starting on {}", addr);
    info!("Provider: {}", config.provider);
    info!("Report endpoint: POST http://{}/report", addr);
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
