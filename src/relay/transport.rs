use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::log::log_sink::LogSink;
use crate::relay::errors::RelayErrorCode;
use crate::relay::protocol::{ConnectionId, FrameError, ProtoError, RelayMsg, read_msg, write_msg};
use crate::relay::server_event::ServerEvent;
use crate::{sink_debug, sink_info, sink_warn};

/// Thin wrapper over a blocking stream that speaks in `RelayMsg`.
pub struct Connection<S> {
    pub connection_id: ConnectionId,
    stream: S,
    max_body: usize,
}

impl<S> Connection<S>
where
    S: Read + Write,
{
    pub fn new(connection_id: ConnectionId, stream: S, max_body: usize) -> Self {
        Self {
            connection_id,
            stream,
            max_body,
        }
    }

    pub fn recv(&mut self) -> Result<RelayMsg, FrameError> {
        read_msg(&mut self.stream, self.max_body)
    }

    pub fn send(&mut self, msg: &RelayMsg) -> Result<(), FrameError> {
        write_msg(&mut self.stream, msg)
    }
}

/// Spawn reader + writer threads for a single TcpStream client.
///
/// `server_tx` is the Sender<ServerEvent> that talks to the central relay loop.
/// The connection is registered before the reader starts, so the loop never
/// sees a message from a connection it does not know. If either thread fails
/// to start, the registration is withdrawn again before the error is returned.
pub fn spawn_connection_threads(
    client_id: ConnectionId,
    stream: TcpStream,
    server_tx: Sender<ServerEvent>,
    log: Arc<dyn LogSink>,
    max_body: usize,
) -> io::Result<()> {
    let (to_client_tx, to_client_rx) = mpsc::channel::<RelayMsg>();

    let read_stream = stream.try_clone()?;
    let shutdown_handle = stream.try_clone()?;
    let write_stream = stream;

    server_tx
        .send(ServerEvent::RegisterClient {
            client_id: client_id.clone(),
            to_client: to_client_tx,
        })
        .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "relay loop has stopped"))?;

    // WRITER THREAD: to_client_rx -> socket
    {
        let writer_tx = server_tx.clone();
        let writer_id = client_id.clone();
        let log = log.clone();
        thread::Builder::new()
            .name(format!("relay-write-{client_id}"))
            .spawn(move || {
                let mut conn = Connection::new(writer_id.clone(), write_stream, max_body);

                while let Ok(msg) = to_client_rx.recv() {
                    if let Err(e) = conn.send(&msg) {
                        sink_warn!(log, "[conn {}] error sending msg: {}", writer_id, e);
                        let _ = writer_tx.send(ServerEvent::Disconnected {
                            client_id: writer_id.clone(),
                        });
                        break;
                    }
                }

                // Either the relay dropped us or the socket failed; make sure
                // the reader unblocks too.
                let _ = shutdown_handle.shutdown(Shutdown::Both);
                sink_info!(log, "[conn {}] writer finished", writer_id);
            })
            .map_err(|e| abandon_registration(&server_tx, &client_id, e))?;
    }

    // READER THREAD: socket -> ServerEvent::MsgFromClient
    {
        let reader_tx = server_tx.clone();
        let reader_id = client_id.clone();
        thread::Builder::new()
            .name(format!("relay-read-{client_id}"))
            .spawn(move || {
                let mut conn = Connection::new(reader_id.clone(), read_stream, max_body);

                loop {
                    let event = match conn.recv() {
                        Ok(msg) => ServerEvent::MsgFromClient {
                            client_id: reader_id.clone(),
                            msg,
                        },
                        Err(e) if e.is_recoverable() => {
                            let code = match e {
                                FrameError::Proto(ProtoError::UnknownType(_)) => {
                                    RelayErrorCode::UnknownMessage
                                }
                                _ => RelayErrorCode::MalformedPayload,
                            };
                            ServerEvent::MalformedFromClient {
                                client_id: reader_id.clone(),
                                code,
                                reason: e.to_string(),
                            }
                        }
                        Err(e) => {
                            match &e {
                                FrameError::Io(io_e)
                                    if io_e.kind() == io::ErrorKind::UnexpectedEof =>
                                {
                                    sink_debug!(log, "[conn {}] closed by peer", reader_id);
                                }
                                other => {
                                    sink_warn!(
                                        log,
                                        "[conn {}] reader stopping: {}",
                                        reader_id,
                                        other
                                    );
                                }
                            }
                            let _ = reader_tx.send(ServerEvent::Disconnected {
                                client_id: reader_id,
                            });
                            break;
                        }
                    };

                    if reader_tx.send(event).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| abandon_registration(&server_tx, &client_id, e))?;
    }

    Ok(())
}

/// Undo a registration whose threads could not be started. The central loop
/// drops the connection, which also closes the writer's channel.
fn abandon_registration(
    server_tx: &Sender<ServerEvent>,
    client_id: &ConnectionId,
    err: io::Error,
) -> io::Error {
    let _ = server_tx.send(ServerEvent::Disconnected {
        client_id: client_id.clone(),
    });
    err
}
