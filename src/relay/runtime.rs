use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use crate::log::log_sink::LogSink;
use crate::relay::protocol::{ConnectionId, RelayMsg};
use crate::relay::router::Router;
use crate::relay::server_event::ServerEvent;
use crate::{sink_debug, sink_info, sink_warn};

/// Central relay loop: owns the Router and maps connection → outgoing channel.
///
/// Every registry read and write happens on this thread, one event at a time.
pub fn run_server_loop(mut router: Router, log: Arc<dyn LogSink>, rx: Receiver<ServerEvent>) {
    use ServerEvent::*;

    let mut clients: HashMap<ConnectionId, Sender<RelayMsg>> = HashMap::new();

    while let Ok(ev) = rx.recv() {
        match ev {
            RegisterClient {
                client_id,
                to_client,
            } => {
                clients.insert(client_id.clone(), to_client);
                router.register_client(client_id.clone());

                sink_info!(
                    log,
                    "registered connection {} in server loop (now {} connections)",
                    client_id,
                    clients.len()
                );
            }

            MsgFromClient { client_id, msg } => {
                sink_debug!(
                    log,
                    "MsgFromClient from {}: {:?}",
                    client_id,
                    msg.msg_type()
                );
                router.handle_from_client(&client_id, msg);
            }

            MalformedFromClient {
                client_id,
                code,
                reason,
            } => {
                router.handle_malformed(&client_id, code, &reason);
            }

            Disconnected { client_id } => {
                if clients.remove(&client_id).is_some() {
                    sink_info!(log, "connection {} disconnected (transport)", client_id);
                }
                router.unregister_client(&client_id);
            }
        }

        deliver_outgoing(&mut router, &clients, &log);
    }

    sink_info!(
        log,
        "ServerEvent channel closed; server loop shutting down ({} connections left)",
        clients.len()
    );
}

/// Hand every pending message to its connection's writer thread.
fn deliver_outgoing(
    router: &mut Router,
    clients: &HashMap<ConnectionId, Sender<RelayMsg>>,
    log: &Arc<dyn LogSink>,
) {
    for (target, out_msg) in router.drain_all_outgoing() {
        match clients.get(&target) {
            Some(tx) => {
                if tx.send(out_msg).is_err() {
                    sink_warn!(
                        log,
                        "failed to deliver message to connection {} (channel closed)",
                        target
                    );
                }
            }
            None => {
                sink_warn!(
                    log,
                    "no connection {} to deliver outgoing message",
                    target
                );
            }
        }
    }
}
