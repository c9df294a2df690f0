//! This is an example of a HL7 Listener service, which
//! is listening on 127.0.0.1:8080 for inbound HL7 messages over MLLP
//!
//! Use Interface Explorer or any other tool (netcat?) to punch data wrapped in MLLP bytes
//! to this process; each message is summarised on the console and acknowledged.
//! Messages without a patient are answered with AE.

use std::error::Error;

use hl7_mllp::{HandlerError, Message, Pid, Server, ServerConfig};

async fn handle(message: Message) -> Result<Option<Message>, HandlerError> {
    println!(
        "Got {}^{} message {}",
        message.message_type(),
        message.trigger_event(),
        message.control_id()
    );

    let patient = message.first::<Pid>().ok_or("message has no PID segment")?;
    if let Some(name) = patient.names.first() {
        println!("  patient: {}, {}", name.family_name, name.given_name);
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let server = Server::new(ServerConfig::new("127.0.0.1:8080"), handle);
    let addr = server.start().await?;
    println!("Listening on {}", addr);

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    println!("Stopped");
    Ok(())
}
