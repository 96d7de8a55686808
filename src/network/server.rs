//! TCP Server
//!
//! Accepts connections and runs one `Session` per client, either inline
//! (sequential) or on a dedicated thread (concurrent).

use std::io::{BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::{AcceptMode, Config};
use crate::error::Result;
use crate::protocol::{write_packet, Packet};
use super::session::Session;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// TCP server for the Classic protocol
pub struct Server {
    config: Arc<Config>,
    listener: TcpListener,

    /// Cleared by `shutdown` to stop the accept loop
    running: AtomicBool,

    /// Dropped on shutdown; every session holds the matching receiver
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,

    /// Sessions currently running on worker threads
    active: Arc<AtomicUsize>,
    workers: Mutex<Vec<Worker>>,

    /// Socket of the session running inline (sequential mode)
    current: Mutex<Option<TcpStream>>,
}

/// A session thread and a handle on its socket for shutdown
struct Worker {
    handle: JoinHandle<()>,
    socket: TcpStream,
}

impl Server {
    /// Validate the config and bind the listening socket
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        let (shutdown_tx, shutdown_rx) = channel::bounded(0);

        Ok(Self {
            config: Arc::new(config),
            listener,
            running: AtomicBool::new(true),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            active: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
            current: Mutex::new(None),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of sessions running on worker threads
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Start accepting clients (blocking until `shutdown`)
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "Listening on {} ({:?} sessions)",
            self.local_addr()?,
            self.config.accept_mode
        );

        while self.running.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping {}: {}", addr, e);
                        continue;
                    }
                    self.dispatch(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in &workers {
            let _ = worker.socket.shutdown(Shutdown::Both);
        }
        for worker in workers {
            let _ = worker.handle.join();
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    ///
    /// Stops the accept loop and ends every session. Spawned sessions end
    /// with `Shutdown`; a session blocked reading the handshake or writing
    /// the level has its socket shut down and ends as closed.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.shutdown_tx.lock().take();

        for worker in self.workers.lock().iter() {
            let _ = worker.socket.shutdown(Shutdown::Both);
        }
        if let Some(socket) = self.current.lock().as_ref() {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    fn dispatch(&self, stream: TcpStream) {
        match self.config.accept_mode {
            AcceptMode::Sequential => self.run_inline(stream),
            AcceptMode::Concurrent => self.spawn_session(stream),
        }
    }

    fn run_inline(&self, stream: TcpStream) {
        let Some((session, socket)) = self.open_session(stream) else {
            return;
        };

        {
            let mut current = self.current.lock();
            if !self.running.load(Ordering::Acquire) {
                let _ = socket.shutdown(Shutdown::Both);
            }
            *current = Some(socket);
        }

        session.run();
        self.current.lock().take();
    }

    fn spawn_session(&self, stream: TcpStream) {
        let mut workers = self.workers.lock();
        workers.retain(|worker| !worker.handle.is_finished());

        if self.active.load(Ordering::Acquire) >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection: {} sessions already running",
                self.config.max_connections
            );
            reject(stream, "Server is full");
            return;
        }

        let Some((session, socket)) = self.open_session(stream) else {
            return;
        };

        let guard = ActiveGuard::acquire(Arc::clone(&self.active));

        let spawned = thread::Builder::new()
            .name(format!("session-{}", session.peer_addr()))
            .spawn(move || {
                let _guard = guard;
                session.run();
            });

        match spawned {
            Ok(handle) => {
                // shutdown may have swept the list before this worker joined it
                if !self.running.load(Ordering::Acquire) {
                    let _ = socket.shutdown(Shutdown::Both);
                }
                workers.push(Worker { handle, socket });
            }
            Err(e) => tracing::error!("Failed to spawn session thread: {}", e),
        }
    }

    fn open_session(&self, stream: TcpStream) -> Option<(Session, TcpStream)> {
        match self.try_open_session(stream) {
            Ok(opened) => Some(opened),
            Err(e) => {
                tracing::warn!("Failed to set up session: {}", e);
                None
            }
        }
    }

    /// Session for an accepted socket plus a clone of the socket
    fn try_open_session(&self, stream: TcpStream) -> Result<(Session, TcpStream)> {
        let socket = stream.try_clone()?;
        let session = Session::new(stream, Arc::clone(&self.config))?
            .with_shutdown(self.shutdown_rx.clone());
        Ok((session, socket))
    }
}

/// Decrements the active session count when a worker exits
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn acquire(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Kick a client before its session starts
fn reject(stream: TcpStream, reason: &str) {
    let mut writer = BufWriter::new(&stream);
    if let Err(e) = write_packet(&mut writer, &Packet::disconnect(reason)) {
        tracing::debug!("Could not send rejection: {}", e);
    }
    drop(writer);
    let _ = stream.shutdown(Shutdown::Both);
}
