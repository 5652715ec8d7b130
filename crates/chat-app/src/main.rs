use std::io::{self, BufReader};
use std::sync::Arc;

use chatbot::app::{TerminalSurface, run};
use chatbot::chat::ChatClient;
use chatbot::settings::ClientSettings;
use chatbot_storage::FileStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the transcript.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let settings = ClientSettings::load(&ClientSettings::default_config_path());
    let store = Arc::new(FileStore::open(settings.resolved_state_path())?);
    let backend = chatbot_backend::create_backend(settings.backend_config())?;

    let surface = TerminalSurface::with_elements(
        BufReader::new(io::stdin()),
        io::stdout(),
        &settings.bindings,
    );
    let mut client = ChatClient::new(&settings, backend, store, surface)?;

    run(&mut client).await?;
    Ok(())
}
