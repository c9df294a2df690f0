//! Protocol client: one MLLP connection, one exchange in flight at a time.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::ack::AckCode;
use crate::builder::{self, ControlIds, MessageBuilder};
use crate::codec::MllpCodec;
use crate::error::{ClientError, Operation};
use crate::message::Message;
use crate::mllp::DEFAULT_MAX_FRAME_SIZE;
use crate::segments::{Obr, Obx, Orc, Pid, Pv1};

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// `host:port` of the receiving system.
    pub address: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Largest response frame accepted before the connection is dropped.
    pub max_frame_size: usize,
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    pub version: String,
    pub processing_id: String,
    /// Prepended to the counter that fills MSH-10.
    pub control_id_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: "127.0.0.1:2575".to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            sending_application: String::new(),
            sending_facility: String::new(),
            receiving_application: String::new(),
            receiving_facility: String::new(),
            version: builder::DEFAULT_VERSION.to_string(),
            processing_id: builder::DEFAULT_PROCESSING_ID.to_string(),
            control_id_prefix: String::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        ClientConfig {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_sender(mut self, application: impl Into<String>, facility: impl Into<String>) -> Self {
        self.sending_application = application.into();
        self.sending_facility = facility.into();
        self
    }

    pub fn with_receiver(mut self, application: impl Into<String>, facility: impl Into<String>) -> Self {
        self.receiving_application = application.into();
        self.receiving_facility = facility.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_processing_id(mut self, processing_id: impl Into<String>) -> Self {
        self.processing_id = processing_id.into();
        self
    }

    pub fn with_control_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.control_id_prefix = prefix.into();
        self
    }
}

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

type Connection = Framed<Box<dyn Transport>, MllpCodec>;

/// An HL7 sender over MLLP.
///
/// The connection sits behind an async mutex, so concurrent `send` calls on
/// a shared client are written and answered strictly one after another.
/// Transport failures and timeouts drop the connection; call
/// [`connect`](Client::connect) again to continue.
pub struct Client {
    config: ClientConfig,
    connection: Mutex<Option<Connection>>,
    ids: ControlIds,
    #[cfg(feature = "tls")]
    tls: Option<(tokio_rustls::TlsConnector, tokio_rustls::rustls::pki_types::ServerName<'static>)>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let ids = ControlIds::new(config.control_id_prefix.clone());
        Client {
            config,
            connection: Mutex::new(None),
            ids,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    /// Wraps every connection in TLS, verifying the peer as `server_name`.
    #[cfg(feature = "tls")]
    pub fn with_tls(
        mut self,
        connector: tokio_rustls::TlsConnector,
        server_name: tokio_rustls::rustls::pki_types::ServerName<'static>,
    ) -> Self {
        self.tls = Some((connector, server_name));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dials the configured address.  Does nothing when already connected.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Ok(());
        }

        let address = &self.config.address;
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ClientError::Connection {
                    address: address.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ClientError::Timeout {
                    operation: Operation::Connect,
                    after: self.config.connect_timeout,
                })
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on {}: {}", address, e);
        }

        let transport = self.upgrade(stream).await?;
        *connection = Some(Framed::new(
            transport,
            MllpCodec::with_max_frame_size(self.config.max_frame_size),
        ));
        info!("Connected to HL7 endpoint {}", address);
        Ok(())
    }

    #[cfg(not(feature = "tls"))]
    async fn upgrade(&self, stream: TcpStream) -> Result<Box<dyn Transport>, ClientError> {
        Ok(Box::new(stream))
    }

    #[cfg(feature = "tls")]
    async fn upgrade(&self, stream: TcpStream) -> Result<Box<dyn Transport>, ClientError> {
        let (connector, server_name) = match &self.tls {
            Some(tls) => tls,
            None => return Ok(Box::new(stream)),
        };

        match timeout(self.config.connect_timeout, connector.connect(server_name.clone(), stream)).await {
            Ok(Ok(tls)) => Ok(Box::new(tls)),
            Ok(Err(e)) => Err(ClientError::Tls(e.to_string())),
            Err(_) => Err(ClientError::Timeout {
                operation: Operation::Connect,
                after: self.config.connect_timeout,
            }),
        }
    }

    /// Closes the connection.  Does nothing when not connected.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        if let Some(mut framed) = connection.take() {
            if let Err(e) = framed.close().await {
                debug!("Error closing connection to {}: {}", self.config.address, e);
            }
            info!("Disconnected from HL7 endpoint {}", self.config.address);
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Sends a message and returns the parsed acknowledgment.
    ///
    /// A response that fails to parse is reported as [`ClientError::Parse`]
    /// and leaves the connection up.  An acknowledgment whose MSA-2 names a
    /// different control ID is [`ClientError::UnexpectedAck`] and drops the
    /// connection.
    pub async fn send(&self, message: &Message) -> Result<Message, ClientError> {
        debug!(
            "Sending {}^{} message {}",
            message.message_type(),
            message.trigger_event(),
            message.control_id()
        );
        let ack = self
            .round_trip(message.to_bytes(), |response| {
                let ack = Message::parse(&response)?;
                match ack.acknowledged_control_id() {
                    Some(acked) if acked != message.control_id() => Err(ClientError::UnexpectedAck {
                        expected: message.control_id().to_string(),
                        received: acked.to_string(),
                    }),
                    _ => Ok(ack),
                }
            })
            .await?;
        debug!(
            "Message {} answered with {}",
            message.control_id(),
            ack.ack_code().map(|c| c.as_str()).unwrap_or("no MSA")
        );
        Ok(ack)
    }

    /// Frames `payload` as is and returns the next frame received, unparsed.
    pub async fn send_raw(&self, payload: Bytes) -> Result<Bytes, ClientError> {
        self.round_trip(payload, Ok).await
    }

    /// One write and one read with the connection lock held.
    ///
    /// The connection is out of its slot until the exchange completes, so a
    /// caller that drops this future leaves the client disconnected rather
    /// than holding a connection with a reply still in flight.
    async fn round_trip<T, F>(&self, payload: Bytes, read: F) -> Result<T, ClientError>
    where
        F: FnOnce(Bytes) -> Result<T, ClientError>,
    {
        let mut connection = self.connection.lock().await;
        let mut framed = connection.take().ok_or(ClientError::NotConnected)?;

        let result = self.exchange(&mut framed, payload).await.and_then(read);
        match &result {
            Ok(_) | Err(ClientError::Parse(_)) => *connection = Some(framed),
            Err(e) => warn!("Dropping connection to {}: {}", self.config.address, e),
        }
        result
    }

    async fn exchange(&self, framed: &mut Connection, payload: Bytes) -> Result<Bytes, ClientError> {
        match timeout(self.config.write_timeout, framed.send(payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(ClientError::Timeout {
                    operation: Operation::Write,
                    after: self.config.write_timeout,
                })
            }
        }

        match timeout(self.config.read_timeout, framed.next()).await {
            Ok(Some(Ok(frame))) => Ok(frame),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout {
                operation: Operation::Read,
                after: self.config.read_timeout,
            }),
        }
    }

    /// The next MSH-10 value from this client's counter.
    pub fn next_control_id(&self) -> String {
        self.ids.next_id()
    }

    fn stamp(&self, builder: MessageBuilder) -> Message {
        builder
            .sending(&*self.config.sending_application, &*self.config.sending_facility)
            .receiving(&*self.config.receiving_application, &*self.config.receiving_facility)
            .version(&*self.config.version)
            .processing_id(&*self.config.processing_id)
            .control_id(self.next_control_id())
            .build()
    }

    /// An ADT message addressed with this client's configured parties.
    pub fn build_adt(&self, trigger_event: &str, patient: Pid, visit: Option<Pv1>) -> Message {
        self.stamp(builder::adt(trigger_event, patient, visit))
    }

    /// An ORM^O01 order addressed with this client's configured parties.
    pub fn build_orm(&self, patient: Pid, order: Orc, request: Obr) -> Message {
        self.stamp(builder::orm(patient, order, request))
    }

    /// An ORU^R01 result addressed with this client's configured parties.
    pub fn build_oru(&self, patient: Pid, request: Obr, results: Vec<Obx>) -> Message {
        self.stamp(builder::oru(patient, request, results))
    }

    /// An acknowledgment of `original` with a fresh control ID.
    pub fn build_ack(&self, original: &Message, code: AckCode, text: &str) -> Message {
        builder::ack(original, code, text)
            .control_id(self.next_control_id())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mllp;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpSocket};

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, address)
    }

    #[tokio::test]
    async fn send_without_connect_fails() {
        let client = Client::new(ClientConfig::default());
        assert!(matches!(
            client.send_raw(Bytes::from_static(b"MSH|^~\\&")).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let (listener, address) = listener().await;
        drop(listener);

        let client = Client::new(ClientConfig::new(address));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }), "{:?}", err);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn connect_and_disconnect_are_idempotent() {
        let (listener, address) = listener().await;
        let accept = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            socket
        });

        let client = Client::new(ClientConfig::new(address));
        client.connect().await.unwrap();
        client.connect().await.unwrap();
        assert!(client.is_connected().await);
        let _socket = accept.await.unwrap();

        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn read_timeout_drops_the_connection() {
        let (listener, address) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            // read and never answer
            while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
        });

        let config = ClientConfig::new(address).with_read_timeout(Duration::from_millis(100));
        let client = Client::new(config);
        client.connect().await.unwrap();

        let err = client.send_raw(Bytes::from_static(b"MSH|^~\\&")).await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
        assert!(matches!(err, ClientError::Timeout { operation: Operation::Read, .. }));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn write_timeout_drops_the_connection() {
        let (listener, address) = listener().await;
        // accepted and held open, never read from
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let config = ClientConfig::new(address).with_write_timeout(Duration::from_millis(200));
        let client = Client::new(config);
        client.connect().await.unwrap();
        let _peer = accept.await.unwrap();

        let payload = Bytes::from(vec![b'X'; 64 * 1024 * 1024]);
        let err = client.send_raw(payload).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { operation: Operation::Write, .. }), "{:?}", err);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn connect_timeout_is_reported() {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let address = listener.local_addr().unwrap();

        // fill the accept queue until further handshakes stall
        let mut queued = Vec::new();
        for _ in 0..16 {
            match timeout(Duration::from_millis(100), TcpStream::connect(address)).await {
                Ok(Ok(stream)) => queued.push(stream),
                _ => break,
            }
        }

        let config = ClientConfig::new(address.to_string()).with_connect_timeout(Duration::from_millis(100));
        let client = Client::new(config);
        let err = client.connect().await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
        assert!(matches!(err, ClientError::Timeout { operation: Operation::Connect, .. }));
        assert!(!client.is_connected().await);
        drop(listener);
    }

    #[tokio::test]
    async fn ack_for_another_message_drops_the_connection() {
        let (listener, address) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            while socket.read(&mut buf).await.unwrap_or(0) > 0 {
                let stale = b"MSH|^~\\&|||||||ACK^A01^ACK|ACK1|P|2.5\rMSA|AA|EARLIER";
                socket.write_all(&mllp::wrap(stale)).await.unwrap();
            }
        });

        let client = Client::new(ClientConfig::new(address).with_control_id_prefix("NOW"));
        client.connect().await.unwrap();
        let msg = client.build_adt("A01", Pid::default(), None);
        let err = client.send(&msg).await.unwrap_err();
        match err {
            ClientError::UnexpectedAck { expected, received } => {
                assert_eq!(expected, "NOW1");
                assert_eq!(received, "EARLIER");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn peer_closing_is_reported() {
        let (listener, address) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let _ = socket.read(&mut buf).await;
        });

        let client = Client::new(ClientConfig::new(address));
        client.connect().await.unwrap();
        let err = client.send_raw(Bytes::from_static(b"MSH|^~\\&")).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed | ClientError::Transport(_)), "{:?}", err);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn unparseable_response_keeps_the_connection() {
        let (listener, address) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            while socket.read(&mut buf).await.unwrap_or(0) > 0 {
                socket.write_all(&mllp::wrap(b"not hl7")).await.unwrap();
            }
        });

        let client = Client::new(ClientConfig::new(address));
        client.connect().await.unwrap();
        let msg = client.build_adt("A01", Pid::default(), None);
        let err = client.send(&msg).await.unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)), "{:?}", err);
        assert!(client.is_connected().await);
    }

    #[test]
    fn builders_use_configured_parties_and_counter() {
        let config = ClientConfig::default()
            .with_sender("LAB", "NORTH")
            .with_receiver("EHR", "MAIN")
            .with_version("2.4")
            .with_control_id_prefix("LAB-");
        let client = Client::new(config);

        let first = client.build_oru(Pid::default(), Obr::default(), vec![Obx::default()]);
        let second = client.build_orm(Pid::default(), Orc::default(), Obr::default());

        assert_eq!(first.control_id(), "LAB-1");
        assert_eq!(second.control_id(), "LAB-2");
        assert_eq!(first.sending_application().namespace_id, "LAB");
        assert_eq!(first.receiving_facility().namespace_id, "MAIN");
        assert_eq!(second.version(), "2.4");

        let ack = client.build_ack(&first, AckCode::Accept, "");
        assert_eq!(ack.control_id(), "LAB-3");
        assert_eq!(ack.acknowledged_control_id(), Some("LAB-1"));
    }
}
