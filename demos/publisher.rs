//! Sends a handful of ADT messages to the listener demo on 127.0.0.1:8080
//! and prints each acknowledgment.

use std::error::Error;

use hl7_mllp::{Client, ClientConfig, ExtendedId, Message, PersonName, Pid, Pv1};

const SAMPLE_HL7: &str = "MSH|^~\\&|EPIC|EPICADT|SMS|SMSADT|199912271408|CHARRIS|ADT^A04|1817457|D|2.5|\rPID||0493575^^^2^ID 1|454721||DOE^JOHN^^^^|DOE^JOHN^^^^|19480203|M||B|254 MYSTREET AVE^^MYTOWN^OH^44123^USA||(216)123-4567|||M|NON|400003403~1129086|\rNK1||ROE^MARIE^^^^|SPO||(216)123-4567||EC|||||||||||||||||||||||||||\rPV1||O|168 ~219~C~PMA^^^^^^^^^||||277^ALLEN MYLASTNAME^BONNIE^^^^|||||||||| ||2688684|||||||||||||||||||||||||199912271408||||||002376853";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ClientConfig::new("127.0.0.1:8080")
        .with_sender("DEMO", "PUBLISHER")
        .with_receiver("LISTENER", "DEMO")
        .with_control_id_prefix("DEMO");
    let client = Client::new(config);
    client.connect().await?;
    println!("connected");

    // a canned message, sent as is
    let canned = Message::parse(SAMPLE_HL7.as_bytes())?;
    let ack = client.send(&canned).await?;
    println!("  {} -> {:?}", canned.control_id(), ack.ack_code());

    for (family, given) in [("Doe", "Jane"), ("Roe", "Richard")] {
        let patient = Pid {
            set_id: Some(1),
            identifiers: vec![ExtendedId::new(client.next_control_id(), "MR")],
            names: vec![PersonName::new(family, given)],
            ..Default::default()
        };
        let visit = Pv1 {
            patient_class: "I".to_string(),
            ..Default::default()
        };

        let message = client.build_adt("A01", patient, Some(visit));
        let ack = client.send(&message).await?;
        println!(
            "  {} -> {:?} {}",
            message.control_id(),
            ack.ack_code(),
            ack.msa().map(|m| m.text_message.as_str()).unwrap_or("")
        );
    }

    client.disconnect().await;
    Ok(())
}
