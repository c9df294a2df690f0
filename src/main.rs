use std::env;
use std::error::Error;

use log::{error, info};

use hl7_mllp::{HandlerError, Message, Server, ServerConfig};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2575";

fn config_from_env() -> Result<ServerConfig, Box<dyn Error>> {
    let address = env::args()
        .nth(1)
        .or_else(|| env::var("HL7_LISTEN_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let mut config = ServerConfig::new(address);
    if let Ok(max) = env::var("HL7_MAX_CONNECTIONS") {
        config = config.with_max_connections(max.parse()?);
    }
    Ok(config)
}

async fn log_message(message: Message) -> Result<Option<Message>, HandlerError> {
    info!(
        "Got {}^{} message {} from {} with {} segments",
        message.message_type(),
        message.trigger_event(),
        message.control_id(),
        message.sending_application().namespace_id,
        message.segments().len() + 1
    );
    for dropped in message.dropped_segments() {
        info!("  line {} was dropped: {}", dropped.line_number, dropped.error);
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = config_from_env()?;
    let server = Server::new(config, log_message);
    let addr = server.start().await?;
    info!("Listening on {}", addr);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for ctrl-c: {}", e);
    }

    server.stop().await;
    Ok(())
}
