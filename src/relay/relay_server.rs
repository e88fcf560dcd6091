use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, mpsc};
use std::{io, thread};

use crate::log::NoopLogSink;
use crate::log::log_sink::LogSink;
use crate::relay::connection_ids::ConnectionIdAllocator;
use crate::relay::registry::{InMemoryRoomRegistry, RoomRegistry};
use crate::relay::relay_engine::RelayEngine;
use crate::relay::router::Router;
use crate::relay::runtime::run_server_loop;
use crate::relay::server_event::ServerEvent;
use crate::relay::settings::RelaySettings;
use crate::relay::transport::spawn_connection_threads;
use crate::{sink_error, sink_info, sink_warn};

/// Top-level runtime object for the relay service.
///
/// This owns:
/// - the bound listener
/// - logging sink
/// - the room registry backend (in-memory unless replaced)
/// and knows how to spin up the central Router+Engine loop plus per-connection threads.
pub struct RelayServer {
    listener: TcpListener,
    settings: RelaySettings,
    log: Arc<dyn LogSink>,
    registry: Box<dyn RoomRegistry>,
}

impl RelayServer {
    /// Bind `settings.bind_addr`. Port 0 picks a free port, see [`RelayServer::local_addr`].
    pub fn bind(settings: RelaySettings, log: Arc<dyn LogSink>) -> io::Result<Self> {
        let listener = TcpListener::bind(&settings.bind_addr)?;
        Ok(Self {
            listener,
            settings,
            log,
            registry: Box::new(InMemoryRoomRegistry::new()),
        })
    }

    pub fn bind_no_log(settings: RelaySettings) -> io::Result<Self> {
        Self::bind(settings, Arc::new(NoopLogSink))
    }

    /// Swap the registry backend before `run`.
    pub fn with_registry<R>(mut self, registry: R) -> Self
    where
        R: RoomRegistry + 'static,
    {
        self.registry = Box::new(registry);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocking main loop: spawn the central relay loop, then accept TCP clients.
    pub fn run(self) -> io::Result<()> {
        let Self {
            listener,
            settings,
            log,
            registry,
        } = self;

        // Events from all connections → central relay loop
        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>();

        {
            let log_for_loop = log.clone();
            let engine = RelayEngine::with_log_and_registry(log.clone(), registry)
                .with_presence_reply(settings.presence_reply)
                .with_max_room_members(settings.max_room_members);
            let router = Router::with_engine(engine, log.clone());

            thread::Builder::new()
                .name("relay-loop".to_owned())
                .spawn(move || {
                    sink_info!(log_for_loop, "[relay] server loop started");
                    run_server_loop(router, log_for_loop, server_rx);
                })?;
        }

        let mut ids = ConnectionIdAllocator::new();
        sink_info!(
            log,
            "relay listening on {} (presence replies go to {:?})",
            listener.local_addr()?,
            settings.presence_reply
        );

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(
                        log,
                        "incoming TCP accept failed: {:?} (continuing to accept)",
                        e
                    );
                    continue;
                }
            };

            let client_id = ids.allocate();
            let peer = stream
                .peer_addr()
                .map_or_else(|_| "?".to_owned(), |a| a.to_string());
            sink_info!(log, "accepted {} as connection {}", peer, client_id);

            if let Err(e) = spawn_connection_threads(
                client_id.clone(),
                stream,
                server_tx.clone(),
                log.clone(),
                settings.max_body_len,
            ) {
                if e.kind() == io::ErrorKind::BrokenPipe {
                    sink_error!(log, "relay loop is gone; stopping accept loop");
                    return Err(e);
                }
                sink_warn!(
                    log,
                    "failed to spawn connection threads for {}: {:?}",
                    client_id,
                    e
                );
            }
        }

        Ok(())
    }
}
