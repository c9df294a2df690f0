//! Protocol server: accepts MLLP connections and answers every message.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::ack::AckCode;
use crate::builder::{self, ControlIds};
use crate::codec::MllpCodec;
use crate::error::{HandlerError, MllpError, ServerError};
use crate::message::Message;
use crate::mllp::DEFAULT_MAX_FRAME_SIZE;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    /// `host:port` to listen on.  Port 0 picks a free port, see [`Server::local_addr`].
    pub bind_address: String,
    /// Connections beyond this many are closed as soon as they are accepted.
    pub max_connections: Option<usize>,
    /// A frame larger than this ends its connection.
    pub max_frame_size: usize,
    /// MSH-3 of generated acknowledgments.  Empty keeps the original receiver.
    pub sending_application: String,
    /// MSH-4 of generated acknowledgments.
    pub sending_facility: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:2575".to_string(),
            max_connections: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            sending_application: String::new(),
            sending_facility: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_address: impl Into<String>) -> Self {
        ServerConfig {
            bind_address: bind_address.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = Some(max_connections);
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
}

/// Application logic behind a [`Server`].
///
/// `Ok(None)` is answered with an `AA` acknowledgment, `Ok(Some(reply))`
/// sends `reply` as is, and `Err` is answered with an `AE` acknowledgment
/// carrying the error text.  Closures of the right shape implement this.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, message: Message) -> BoxFuture<'static, Result<Option<Message>, HandlerError>>;
}

impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Message>, HandlerError>> + Send + 'static,
{
    fn handle(&self, message: Message) -> BoxFuture<'static, Result<Option<Message>, HandlerError>> {
        self(message).boxed()
    }
}

struct Running {
    token: CancellationToken,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

/// State shared by the accept loop and every connection task.
struct Context {
    config: ServerConfig,
    handler: Arc<dyn MessageHandler>,
    ids: Arc<ControlIds>,
    #[cfg(feature = "tls")]
    tls: Option<tokio_rustls::TlsAcceptor>,
}

/// An HL7 listener over MLLP.
pub struct Server {
    config: ServerConfig,
    handler: Arc<dyn MessageHandler>,
    ids: Arc<ControlIds>,
    state: RwLock<Option<Running>>,
    #[cfg(feature = "tls")]
    tls: Option<tokio_rustls::TlsAcceptor>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn new<H: MessageHandler>(config: ServerConfig, handler: H) -> Self {
        Server {
            config,
            handler: Arc::new(handler),
            ids: Arc::new(ControlIds::new("ACK")),
            state: RwLock::new(None),
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    /// Terminates TLS on every accepted connection.
    #[cfg(feature = "tls")]
    pub fn with_tls(mut self, acceptor: tokio_rustls::TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and spawns the accept loop.  Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut state = self.state.write().await;
        if state.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let bind_error = |source| ServerError::Bind {
            address: self.config.bind_address.clone(),
            source,
        };
        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let context = Arc::new(Context {
            config: self.config.clone(),
            handler: self.handler.clone(),
            ids: self.ids.clone(),
            #[cfg(feature = "tls")]
            tls: self.tls.clone(),
        });
        let token = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(listener, context, token.clone()));

        info!("HL7 listener started on {}", local_addr);
        *state = Some(Running {
            token,
            local_addr,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections.  Connections already open are left to
    /// finish on their own.  Does nothing when not running.
    pub async fn stop(&self) {
        let running = self.state.write().await.take();
        if let Some(running) = running {
            running.token.cancel();
            if let Err(e) = running.accept_task.await {
                warn!("Accept loop on {} ended abnormally: {}", running.local_addr, e);
            }
            info!("HL7 listener on {} stopped", running.local_addr);
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.state.read().await.as_ref().map(|r| r.local_addr)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.state.get_mut().take() {
            running.token.cancel();
        }
    }
}

async fn accept_loop(listener: TcpListener, context: Arc<Context>, token: CancellationToken) {
    let ceiling = context
        .config
        .max_connections
        .map(|max| (max, Arc::new(Semaphore::new(max))));

    loop {
        let (stream, peer) = tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    // back off so a persistent error (e.g. out of descriptors) does not spin
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
        };

        let permit = match &ceiling {
            Some((max, slots)) => match slots.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!("Rejecting connection from {}, {} connections already open", peer, max);
                    drop(stream);
                    continue;
                }
            },
            None => None,
        };

        let context = context.clone();
        tokio::spawn(async move {
            let _permit = permit;
            debug!("Connection opened from {}", peer);
            match context.serve(stream, peer).await {
                Ok(()) => debug!("Connection from {} closed", peer),
                Err(e) => warn!("Connection from {} ended: {}", peer, e),
            }
        });
    }

    debug!("Accept loop on {:?} exiting", listener.local_addr());
}

impl Context {
    #[cfg(not(feature = "tls"))]
    async fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), MllpError> {
        self.exchange_frames(stream, peer).await
    }

    #[cfg(feature = "tls")]
    async fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), MllpError> {
        match &self.tls {
            Some(acceptor) => {
                let stream = acceptor.accept(stream).await?;
                self.exchange_frames(stream, peer).await
            }
            None => self.exchange_frames(stream, peer).await,
        }
    }

    async fn exchange_frames<T>(&self, io: T, peer: SocketAddr) -> Result<(), MllpError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut transport = Framed::new(io, MllpCodec::with_max_frame_size(self.config.max_frame_size));

        while let Some(frame) = transport.next().await {
            let frame = frame?;
            let message = match Message::parse(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Dropping unparseable frame from {}: {}", peer, e);
                    continue;
                }
            };

            let response = self.respond(message).await;
            transport.send(response.to_bytes()).await?;
        }
        Ok(())
    }

    async fn respond(&self, message: Message) -> Message {
        // header only, for building the acknowledgment after the handler owns the message
        let original = Message::new(message.header().clone(), Vec::new(), *message.delimiters());
        debug!(
            "Handling {}^{} message {}",
            original.message_type(),
            original.trigger_event(),
            original.control_id()
        );

        match self.handler.handle(message).await {
            Ok(Some(response)) => response,
            Ok(None) => self.ack(&original, AckCode::Accept, String::new()),
            Err(e) => {
                warn!("Handler rejected message {}: {}", original.control_id(), e);
                self.ack(&original, AckCode::Error, e.to_string())
            }
        }
    }

    fn ack(&self, original: &Message, code: AckCode, text: String) -> Message {
        let mut ack = builder::ack(original, code, text).control_id(self.ids.next_id());
        if !self.config.sending_application.is_empty() || !self.config.sending_facility.is_empty() {
            ack = ack.sending(&*self.config.sending_application, &*self.config.sending_facility);
        }
        ack.build()
    }
}
