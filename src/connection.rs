//! Connection management: host/guest establishment and the per-connection
//! message loops.
//!
//! Each connection runs exactly one inbound loop (read, decode, dispatch to
//! the session) and one writer draining the session's outbound queue in
//! order. Fatal failures move the session to its aborted state through the
//! event stream; the loops then exit.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::protocol::{Message, Parameters};
use crate::session::{Phase, Session, SessionError, SessionEvent, SessionHandle};
use crate::transport::{tcp, MessageReader, MessageWriter};

/// Failures establishing or keeping the connection.
#[derive(Debug)]
pub enum ConnectionError {
    /// Could not bind the listening endpoint.
    Bind(std::io::Error),
    /// Could not accept the guest's connection.
    Accept(std::io::Error),
    /// Could not connect to the host.
    Connect(std::io::Error),
    /// The established connection failed mid-session.
    PeerDisconnected(String),
}

impl core::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConnectionError::Bind(e) => write!(f, "failed to bind listener: {}", e),
            ConnectionError::Accept(e) => write!(f, "failed to accept connection: {}", e),
            ConnectionError::Connect(e) => write!(f, "failed to connect: {}", e),
            ConnectionError::PeerDisconnected(why) => write!(f, "peer connection lost: {}", why),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Bind(e)
            | ConnectionError::Accept(e)
            | ConnectionError::Connect(e) => Some(e),
            ConnectionError::PeerDisconnected(_) => None,
        }
    }
}

/// A running session and its connection task.
pub struct SessionLink {
    pub handle: SessionHandle,
    pub events: UnboundedReceiver<SessionEvent>,
    pub task: JoinHandle<anyhow::Result<()>>,
    /// The bound listener address (host) or the stream's local address
    /// (guest).
    pub local_addr: SocketAddr,
}

/// Start hosting: fix the parameters, bind `port` and accept exactly one
/// guest. The Parameters message is delivered as soon as the guest
/// connects; positioning may begin immediately.
pub async fn host(port: u16, params: Parameters) -> anyhow::Result<SessionLink> {
    host_with_timeout(port, params, None).await
}

/// Like [`host`], with a timeout applied to every read and write on the
/// established connection, so a silent peer aborts the session instead of
/// hanging it.
pub async fn host_with_timeout(
    port: u16,
    params: Parameters,
    io_timeout: Option<Duration>,
) -> anyhow::Result<SessionLink> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(ConnectionError::Bind)?;
    let local_addr = listener.local_addr().map_err(ConnectionError::Bind)?;
    let (events_tx, events_rx) = unbounded_channel();
    let (out_tx, out_rx) = unbounded_channel();
    let session = Arc::new(Mutex::new(Session::host(params, events_tx, out_tx)?));
    let handle = SessionHandle::new(session.clone());
    log::info!("listening on {}", local_addr);
    let task = tokio::spawn(async move {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                let error = ConnectionError::Accept(e);
                let text = error.to_string();
                session
                    .lock()
                    .unwrap()
                    .abort(SessionError::Connection(error));
                return Err(anyhow::anyhow!(text));
            }
        };
        log::info!("guest connected from {}", peer_addr);
        session.lock().unwrap().connected();
        let (reader, writer) = tcp::split_with_timeout(stream, io_timeout);
        run_link(reader, writer, session, out_rx).await
    });
    Ok(SessionLink {
        handle,
        events: events_rx,
        task,
        local_addr,
    })
}

/// Connect to a host and wait for its parameters.
pub async fn join<A: ToSocketAddrs>(addr: A) -> anyhow::Result<SessionLink> {
    join_with_timeout(addr, None).await
}

/// Like [`join`], with a timeout applied to every read and write on the
/// established connection.
pub async fn join_with_timeout<A: ToSocketAddrs>(
    addr: A,
    io_timeout: Option<Duration>,
) -> anyhow::Result<SessionLink> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(ConnectionError::Connect)?;
    let local_addr = stream.local_addr().map_err(ConnectionError::Connect)?;
    log::info!("connected to host at {}", stream.peer_addr()?);
    let (events_tx, events_rx) = unbounded_channel();
    let (out_tx, out_rx) = unbounded_channel();
    let session = Arc::new(Mutex::new(Session::guest(events_tx, out_tx)));
    let handle = SessionHandle::new(session.clone());
    session.lock().unwrap().connected();
    let (reader, writer) = tcp::split_with_timeout(stream, io_timeout);
    let task = tokio::spawn(async move { run_link(reader, writer, session, out_rx).await });
    Ok(SessionLink {
        handle,
        events: events_rx,
        task,
        local_addr,
    })
}

/// Drive one established connection until the game finishes or the link
/// fails. Public so tests can run sessions over the in-memory transport.
pub async fn run_link(
    reader: impl MessageReader + 'static,
    writer: impl MessageWriter + 'static,
    session: Arc<Mutex<Session>>,
    outbound: UnboundedReceiver<Message>,
) -> anyhow::Result<()> {
    let writer_task = tokio::spawn(write_loop(writer, session.clone(), outbound));
    let result = read_loop(reader, &session).await;
    if result.is_ok() {
        // Let queued messages (the final Outcome in particular) flush.
        let _ = writer_task.await;
    } else {
        writer_task.abort();
    }
    result
}

async fn read_loop(
    mut reader: impl MessageReader,
    session: &Arc<Mutex<Session>>,
) -> anyhow::Result<()> {
    loop {
        match reader.recv().await {
            Ok(msg) => {
                let mut session = session.lock().unwrap();
                if let Err(e) = session.handle_message(msg) {
                    session.abort(SessionError::Protocol(e.clone()));
                    return Err(e.into());
                }
                if session.phase() == Phase::Finished {
                    return Ok(());
                }
            }
            Err(e) => {
                let mut session = session.lock().unwrap();
                if session.phase() == Phase::Finished {
                    return Ok(());
                }
                // A frame that failed to decode is a protocol violation;
                // anything else is a transport failure.
                return match e.downcast::<crate::protocol::ProtocolError>() {
                    Ok(protocol_error) => {
                        session.abort(SessionError::Protocol(protocol_error.clone()));
                        Err(protocol_error.into())
                    }
                    Err(other) => {
                        let error = ConnectionError::PeerDisconnected(other.to_string());
                        let text = error.to_string();
                        session.abort(SessionError::Connection(error));
                        Err(anyhow::anyhow!(text))
                    }
                };
            }
        }
    }
}

async fn write_loop(
    mut writer: impl MessageWriter,
    session: Arc<Mutex<Session>>,
    mut outbound: UnboundedReceiver<Message>,
) -> anyhow::Result<()> {
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = writer.send(msg).await {
            let mut session = session.lock().unwrap();
            if session.phase() != Phase::Finished {
                session.abort(SessionError::Connection(ConnectionError::PeerDisconnected(
                    e.to_string(),
                )));
            }
            return Err(e);
        }
    }
    Ok(())
}
