use flyerbot::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting flyerbot");

    // Load configuration
    let config = startup::load_config()?;

    // Start the webhook server
    startup::serve(config).await
}
