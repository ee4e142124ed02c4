//! Fan-out over loopback UDP.
//!
//! Every listener binds its own ephemeral port on `127.0.0.1` and registers
//! it as a marker file in `<base>/<channel>/peers/<port>`. Posting
//! sends one datagram to each registered port. Delivery is unordered and
//! at-most-once: a process that is not listening when a message is posted
//! never sees it.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{FanoutChannel, Listener, MessageHandler, TransportError};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM: usize = 65_507;

/// How long a listener thread blocks before checking its stop flag.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

pub struct LoopbackChannel {
    peers_dir: PathBuf,
    sender: UdpSocket,
    /// Ports of listeners attached through this handle; posts skip them.
    own_ports: Arc<Mutex<HashSet<u16>>>,
}

impl LoopbackChannel {
    /// Default location of rendezvous directories.
    pub fn default_base() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("lumina")
    }

    pub fn open(name: &str, base: &Path) -> Result<Self, TransportError> {
        let peers_dir = base.join(name).join("peers");
        std::fs::create_dir_all(&peers_dir)?;
        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;

        let pruned = prune_stale_peers(&peers_dir);
        if pruned > 0 {
            debug!(pruned, "Removed stale fan-out peers");
        }
        info!(channel = name, dir = %peers_dir.display(), "Fan-out channel open");

        Ok(Self {
            peers_dir,
            sender,
            own_ports: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    fn peer_ports(&self) -> Vec<u16> {
        let Ok(entries) = std::fs::read_dir(&self.peers_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u16>().ok())
            .collect()
    }

    fn is_own(&self, port: u16) -> bool {
        self.own_ports
            .lock()
            .map(|ports| ports.contains(&port))
            .unwrap_or(false)
    }
}

impl FanoutChannel for LoopbackChannel {
    fn post(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_DATAGRAM {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                limit: MAX_DATAGRAM,
            });
        }

        let mut delivered = 0usize;
        for port in self.peer_ports() {
            if self.is_own(port) {
                continue;
            }
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
            match self.sender.send_to(payload, addr) {
                Ok(_) => delivered += 1,
                Err(e) => debug!(port, error = %e, "Fan-out send failed"),
            }
        }
        debug!(peers = delivered, bytes = payload.len(), "Fan-out post");
        Ok(())
    }

    fn listen(&self, handler: MessageHandler) -> Result<Listener, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let port = socket.local_addr()?.port();

        let marker = self.peers_dir.join(port.to_string());
        std::fs::write(&marker, std::process::id().to_string())?;
        if let Ok(mut ports) = self.own_ports.lock() {
            ports.insert(port);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("lumina-fanout-{port}"))
            .spawn(move || {
                let mut buf = vec![0u8; MAX_DATAGRAM];
                while !thread_stop.load(Ordering::Relaxed) {
                    match socket.recv_from(&mut buf) {
                        Ok((len, _)) => handler(buf[..len].to_vec()),
                        Err(e)
                            if matches!(
                                e.kind(),
                                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                            ) => {}
                        Err(e) => {
                            warn!(port, error = %e, "Fan-out listener stopped");
                            break;
                        }
                    }
                }
            })?;
        debug!(port, "Fan-out listener attached");

        let own_ports = self.own_ports.clone();
        Ok(Listener::new(move || {
            stop.store(true, Ordering::Relaxed);
            let _ = std::fs::remove_file(&marker);
            if let Ok(mut ports) = own_ports.lock() {
                ports.remove(&port);
            }
            let _ = handle.join();
            debug!(port, "Fan-out listener detached");
        }))
    }
}

/// Remove markers whose port can be bound again, meaning no process is
/// listening there anymore.
fn prune_stale_peers(peers_dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(peers_dir) else {
        return 0;
    };
    let mut pruned = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let Some(port) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u16>().ok())
        else {
            continue;
        };
        if UdpSocket::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
            && std::fs::remove_file(entry.path()).is_ok()
        {
            pruned += 1;
        }
    }
    pruned
}
