// src/server/reload.rs

//! Browser notification channel.
//!
//! A websocket listener on its own thread accepts browser connections; a
//! second thread pushes `reload` / `css` messages to every connected client
//! and drops the ones that went away.

use std::fmt;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};
use tungstenite::WebSocket;

use crate::errors::{BuildloopError, Result};
use crate::types::ReloadKind;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// IO errors that mean the browser end of a socket is gone for good.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

/// Upper bound on kept connections; the oldest ones are closed first.
const MAX_CLIENTS: usize = 10;

pub struct ReloadHub {
    port: u16,
    tx: Sender<ReloadKind>,
    clients: Clients,
    _incoming: JoinHandle<()>,
    _broadcast: JoinHandle<()>,
}

impl fmt::Debug for ReloadHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadHub")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl ReloadHub {
    /// Bind `127.0.0.1:<port>` (0 picks a free port) and start serving.
    pub fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
            BuildloopError::ProcessStartError(format!(
                "cannot bind reload channel on port {}: {}",
                port, e
            ))
        })?;
        let port = listener.local_addr()?.port();

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let incoming = spawn_incoming(listener, Arc::clone(&clients));
        let (tx, broadcast) = spawn_broadcast(Arc::clone(&clients));

        info!(port, "reload channel listening");

        Ok(Self {
            port,
            tx,
            clients,
            _incoming: incoming,
            _broadcast: broadcast,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Queue a notification for every connected browser.
    pub fn notify(&self, kind: ReloadKind) {
        debug!(message = kind.message(), "queueing browser notification");
        if self.tx.send(kind).is_err() {
            warn!("reload broadcast thread has stopped; notification dropped");
        }
    }

    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }
}

fn lock(clients: &Clients) -> MutexGuard<'_, Vec<WebSocket<TcpStream>>> {
    clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn spawn_incoming(listener: TcpListener, clients: Clients) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "reload channel: failed to accept connection");
                    continue;
                }
            };
            match tungstenite::accept(stream) {
                Ok(socket) => {
                    debug!("browser connected to reload channel");
                    lock(&clients).push(socket);
                }
                Err(e) => warn!(error = %e, "reload channel: websocket handshake failed"),
            }
        }
    })
}

fn spawn_broadcast(clients: Clients) -> (Sender<ReloadKind>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<ReloadKind>();

    let thread = std::thread::spawn(move || {
        while let Ok(kind) = rx.recv() {
            let mut clients = lock(&clients);
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send(kind.message().into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) if is_disconnect(&e) => {
                        debug!(error = %e, "reload channel: client went away");
                        broken.push(i);
                    }
                    Err(
                        tungstenite::error::Error::ConnectionClosed
                        | tungstenite::error::Error::AlreadyClosed,
                    ) => broken.push(i),
                    Err(e) => {
                        error!(error = ?e, "reload channel: send failed");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            let len = clients.len();
            if len > MAX_CLIENTS {
                for mut socket in clients.drain(0..len - MAX_CLIENTS) {
                    socket.close(None).ok();
                }
            }

            info!(message = kind.message(), clients = clients.len(), "browsers notified");
        }
    });

    (tx, thread)
}
