//! Sightline observer.
//!
//! Receives delimiter-framed JSON from instrumented producers over UDP,
//! tracks one session per producer endpoint, hands decoded payloads to a
//! display sink and forwards edit commands back to the producer that owns
//! the edited state.
//!
//! # Architecture
//!
//! The session layer is the sans-IO [`ObserverDriver`]: events go in, actions
//! come out, and time is read through [`Environment`]. [`Observer`] is the
//! production runtime around it. It owns the UDP socket and runs a single
//! task that serializes every event (datagrams, submitted commands, liveness
//! deadlines, sink closure) through the driver, so session state needs no
//! locking.
//!
//! # Components
//!
//! - [`ObserverDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`SessionRegistry`]: Endpoint identifier to session mapping
//! - [`Observer`]: Production runtime that executes driver actions
//! - [`UdpTransport`]: UDP socket shared by all producers
//! - [`SystemEnv`]: Production environment (real time)
//! - [`DisplaySink`]: Headless display sink used by the `sightline` binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod display;
mod driver;
mod error;
mod registry;
mod system_env;
mod transport;

use std::net::SocketAddr;

use bytes::Bytes;
pub use display::{CommandRequest, DisplaySink};
pub use driver::{DriverConfig, LogLevel, ObserverAction, ObserverDriver, ObserverEvent};
pub use error::ObserverError;
pub use registry::SessionRegistry;
use serde_json::Value;
use sightline_core::{SessionId, env::Environment};
use sightline_proto::Command;
pub use system_env::SystemEnv;
use tokio::sync::mpsc;
pub use transport::UdpTransport;

/// Default receive buffer, large enough for any UDP datagram over IPv4.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65536;

/// Observer configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Address to bind to (e.g., "0.0.0.0:8000")
    pub bind_address: String,
    /// Size of the datagram receive buffer in bytes
    pub recv_buffer_size: usize,
    /// Driver configuration (liveness timeout)
    pub driver: DriverConfig,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            driver: DriverConfig::default(),
        }
    }
}

/// Event delivered to the display sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A producer sent a message
    Message {
        /// Producer the message came from
        session_id: SessionId,
        /// The message's `data` payload
        data: Value,
    },

    /// A producer went silent and its session was evicted
    Disconnect {
        /// Evicted producer
        session_id: SessionId,
    },
}

/// Command source handle.
///
/// Cheap to clone. Submissions are fire-and-forget: a command addressed to a
/// session that does not exist (or no longer exists) is dropped without any
/// report back to the caller.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    tx: mpsc::UnboundedSender<(SessionId, Command)>,
}

impl CommandHandle {
    /// Forward `command` to the producer behind `session_id`.
    pub fn submit(&self, session_id: SessionId, command: Command) {
        if self.tx.send((session_id, command)).is_err() {
            tracing::debug!("observer stopped, dropping command for {}", session_id);
        }
    }
}

/// Production sightline observer.
///
/// Wraps `ObserverDriver` with a UDP socket and the system clock.
pub struct Observer {
    /// The action-based observer driver
    driver: ObserverDriver<SystemEnv>,
    /// UDP socket
    transport: UdpTransport,
    /// Environment
    env: SystemEnv,
    /// Sender side handed out through `CommandHandle`
    commands_tx: mpsc::UnboundedSender<(SessionId, Command)>,
    /// Submitted commands, drained by `run`
    commands_rx: mpsc::UnboundedReceiver<(SessionId, Command)>,
    /// Datagram receive buffer size
    recv_buffer_size: usize,
}

impl Observer {
    /// Create and bind a new observer.
    pub async fn bind(config: ObserverConfig) -> Result<Self, ObserverError> {
        if config.recv_buffer_size == 0 {
            return Err(ObserverError::Config("receive buffer size must be non-zero".to_string()));
        }
        if config.driver.liveness_timeout.is_zero() {
            return Err(ObserverError::Config("liveness timeout must be non-zero".to_string()));
        }

        let env = SystemEnv::new();
        let driver = ObserverDriver::new(env.clone(), config.driver);
        let transport = UdpTransport::bind(&config.bind_address).await?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        Ok(Self {
            driver,
            transport,
            env,
            commands_tx,
            commands_rx,
            recv_buffer_size: config.recv_buffer_size,
        })
    }

    /// Handle for submitting commands while the observer runs.
    pub fn command_handle(&self) -> CommandHandle {
        CommandHandle { tx: self.commands_tx.clone() }
    }

    /// Local address the observer is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ObserverError> {
        self.transport.local_addr()
    }

    /// Run the observer, delivering decoded messages and disconnects to
    /// `sink`.
    ///
    /// Returns `Ok(())` once the sink's receiver is dropped. Socket errors
    /// while receiving are logged and do not stop the loop.
    pub async fn run(self, sink: mpsc::Sender<SinkEvent>) -> Result<(), ObserverError> {
        let Self { mut driver, transport, env, commands_tx, mut commands_rx, recv_buffer_size } =
            self;
        tracing::info!("Observer starting on {}", transport.local_addr()?);

        // Handles keep the channel open; ours must not.
        drop(commands_tx);

        let mut buf = vec![0u8; recv_buffer_size];
        let mut commands_open = true;

        loop {
            let wait = driver
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(env.now()));

            // Due deadlines go first so ticks are not starved by traffic.
            let event = tokio::select! {
                biased;

                () = sink.closed() => ObserverEvent::SinkClosed,

                () = env.sleep(wait.unwrap_or_default()), if wait.is_some() => ObserverEvent::Tick,

                received = transport.recv_from(&mut buf) => match received {
                    Ok((len, from)) => ObserverEvent::DatagramReceived {
                        from,
                        bytes: Bytes::copy_from_slice(&buf[..len]),
                    },
                    Err(e) => {
                        tracing::warn!("receive failed: {}", e);
                        continue;
                    },
                },

                command = commands_rx.recv(), if commands_open => match command {
                    Some((session_id, command)) => {
                        ObserverEvent::CommandSubmitted { session_id, command }
                    },
                    None => {
                        commands_open = false;
                        continue;
                    },
                },
            };

            let closing = matches!(event, ObserverEvent::SinkClosed);
            let actions = driver.process_event(event);
            execute_actions(actions, &transport, &sink).await;

            if closing {
                tracing::info!("Observer stopped");
                return Ok(());
            }
        }
    }
}

/// Execute observer actions.
async fn execute_actions(
    actions: Vec<ObserverAction>,
    transport: &UdpTransport,
    sink: &mpsc::Sender<SinkEvent>,
) {
    for action in actions {
        match action {
            ObserverAction::Deliver { session_id, data } => {
                if sink.send(SinkEvent::Message { session_id, data }).await.is_err() {
                    tracing::debug!("display sink gone, dropping message from {}", session_id);
                }
            },

            ObserverAction::Disconnect { session_id } => {
                if sink.send(SinkEvent::Disconnect { session_id }).await.is_err() {
                    tracing::debug!("display sink gone, dropping disconnect of {}", session_id);
                }
            },

            ObserverAction::SendDatagram { to, bytes } => transport.send_to(to, &bytes).await,

            ObserverAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}
