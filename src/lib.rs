/*!
# HL7 v2.x messages over MLLP, for tokio.

 HL7's MLLP is a simple, single-byte-text based protocol for framing HL7 messages over a TCP (or similar) transport:
 each message travels as `0x0B`, the message text, then `0x1C 0x0D`.

 This crate covers the whole trip:
 - [`MllpCodec`], a [Codec](https://docs.rs/tokio-util/latest/tokio_util/codec/index.html) that encodes/decodes MLLP frames
   on a Tokio stream, built on the byte-by-byte [`Mllp`] state machine.
 - [`Message`], parsed from pipe-delimited text with the delimiters declared in its own MSH header, with typed
   segments (MSH, EVN, PID, PV1, NK1, IN1, ORC, OBR, OBX, DG1, PR1, AL1, RXA, MSA) and a verbatim fallback for any other tag.
 - [`builder`] for outbound ADT, ORM, ORU and ACK messages.
 - [`Client`], which sends a message and waits for its acknowledgment, and [`Server`], which answers every
   message through a [`MessageHandler`].

 ## Example
 This is a highly simplified example, lifted from the demos included in source control.

 ### Publisher
 ```no_run
use hl7_mllp::{Client, ClientConfig, Pid, PersonName};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new(ClientConfig::new("127.0.0.1:2575").with_sender("DEMO", "LAB"));
    client.connect().await?;

    let patient = Pid {
        names: vec![PersonName::new("Doe", "Jane")],
        ..Default::default()
    };
    let message = client.build_adt("A01", patient, None);

    let ack = client.send(&message).await?;
    println!("  Received {:?} for {}", ack.ack_code(), message.control_id());

    client.disconnect().await;
    Ok(())
}
```

 ### Listener
 ```no_run
use hl7_mllp::{HandlerError, Message, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::new(ServerConfig::new("0.0.0.0:2575"), |message: Message| async move {
        println!("Got {}^{}", message.message_type(), message.trigger_event());
        Ok::<_, HandlerError>(None) // default AA acknowledgment
    });
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}
```

 # Crate Features
 - `tls`: TLS on both [`Client`] and [`Server`] through `tokio-rustls`.
 - `serde`: `Serialize`/`Deserialize` for [`ClientConfig`], [`ServerConfig`] and [`ParseMode`].
 */

pub mod ack;
pub mod builder;
pub mod client;
pub mod codec;
pub mod datetime;
pub mod delimiters;
pub mod error;
pub mod escape;
pub mod fields;
pub mod message;
pub mod mllp;
pub mod segments;
pub mod server;
pub mod types;

pub use ack::AckCode;
pub use builder::{ControlIds, MessageBuilder};
pub use client::{Client, ClientConfig};
pub use codec::MllpCodec;
pub use datetime::Timestamp;
pub use delimiters::Delimiters;
pub use error::{ClientError, HandlerError, MllpError, Operation, ParseError, ServerError};
pub use message::{DroppedSegment, Message, ParseMode};
pub use mllp::Mllp;
pub use segments::{
    Al1, Dg1, Evn, GenericSegment, In1, Msa, Msh, Nk1, Obr, Obx, Orc, Pid, Pr1, Pv1, Rxa, Segment,
};
pub use server::{MessageHandler, Server, ServerConfig};
pub use types::{
    Address, CodedElement, EntityIdentifier, ExtendedId, HierarchicDesignator, Location,
    MessageType, PersonName, Provider,
};
