//! Non-blocking TCP/UDP multiplexer: one registry of sockets guarded by a
//! single mutex, one dispatcher thread draining an mpsc channel fed by a
//! dedicated reader thread per registered socket (mirrors the split between
//! `rtp_session.rs`'s blocking per-socket reader and its single
//! `rx.recv_timeout`-driven dispatch loop, generalized from "one RTP/RTCP
//! socket pair" to an arbitrary table of sockets).
//!
//! Supports the three WFD transport modes: UDP (separate RTP/RTCP sockets),
//! TCP-interleaved (RFC 2326 §10.12 `$<channel><len16>` framing sharing the
//! RTSP control connection), and plain TCP.
use std::collections::HashMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::log::log_sink::LogSink;
use crate::looper::Looper;
use crate::{sink_debug, sink_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Udp,
    TcpInterleaved,
    Tcp,
}

#[derive(Debug)]
pub enum NetSessionError {
    Io(io::Error),
    UnknownSocket(SocketId),
    NotUdp(SocketId),
    NotStream(SocketId),
    Poisoned,
}

impl std::fmt::Display for NetSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::UnknownSocket(id) => write!(f, "unknown socket {}", id.0),
            Self::NotUdp(id) => write!(f, "socket {} is not a UDP socket", id.0),
            Self::NotStream(id) => write!(f, "socket {} is not a TCP stream", id.0),
            Self::Poisoned => write!(f, "socket table mutex poisoned"),
        }
    }
}

impl std::error::Error for NetSessionError {}

impl From<io::Error> for NetSessionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl<T> From<PoisonError<T>> for NetSessionError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

/// One frame of data arriving on a registered socket, handed to the
/// dispatcher. For `TcpInterleaved` sockets a single read can yield several
/// of these (one per drained frame) plus at most one `Text` chunk for the
/// RTSP bytes sharing the connection.
#[derive(Debug, Clone)]
pub enum NetEvent {
    /// A whole UDP datagram, or one interleaved binary frame.
    Datagram { socket: SocketId, channel: u8, bytes: Vec<u8> },
    /// Plain-text bytes on a TCP/TCP-interleaved socket (RTSP request or
    /// response bytes; message framing is the caller's job).
    Text { socket: SocketId, bytes: Vec<u8> },
    Closed { socket: SocketId },
}

enum SocketKind {
    Udp(Arc<UdpSocket>),
    Stream(Arc<Mutex<TcpStream>>),
}

struct SocketEntry {
    kind: SocketKind,
    peer: Option<SocketAddr>,
    mode: TransportMode,
}

/// Registry of sockets plus the one I/O dispatch thread reading from all of
/// them. Each registered socket gets its own blocking reader thread (sockets
/// block on read/recv_from); all of them funnel into one `Sender<NetEvent>`
/// so a single `Looper` drains the queue in FIFO order, matching the
/// "no shared mutable state except the socket table" scheduling rule.
pub struct NetworkSession {
    sockets: Arc<Mutex<HashMap<SocketId, SocketEntry>>>,
    next_id: AtomicU32,
    tx_evt: Sender<NetEvent>,
    logger: Arc<dyn LogSink>,
    looper: Option<Looper>,
}

impl NetworkSession {
    #[must_use]
    pub fn new(logger: Arc<dyn LogSink>) -> (Self, Receiver<NetEvent>) {
        let (tx_evt, rx_evt) = channel();
        (
            Self {
                sockets: Arc::new(Mutex::new(HashMap::new())),
                next_id: AtomicU32::new(1),
                tx_evt,
                logger,
                looper: None,
            },
            rx_evt,
        )
    }

    fn alloc_id(&self) -> SocketId {
        SocketId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Binds a UDP socket and spawns its reader thread. `peer`, once known,
    /// restricts delivery the way `BufferedUdpChannel` filters by source
    /// address; `None` accepts datagrams from any source (used for the
    /// server-side listening socket before the sink's address is learned).
    pub fn register_udp(
        &self,
        bind_addr: impl ToSocketAddrs,
        peer: Option<SocketAddr>,
    ) -> Result<SocketId, NetSessionError> {
        let sock = UdpSocket::bind(bind_addr)?;
        let sock = Arc::new(sock);
        let id = self.alloc_id();
        self.sockets.lock()?.insert(
            id,
            SocketEntry { kind: SocketKind::Udp(sock.clone()), peer, mode: TransportMode::Udp },
        );

        let tx = self.tx_evt.clone();
        let logger = self.logger.clone();
        thread::spawn(move || {
            let mut buf = vec![0u8; 65_507];
            loop {
                match sock.recv_from(&mut buf) {
                    Ok((n, from)) => {
                        if let Some(expected) = peer
                            && from != expected
                        {
                            sink_warn!(&logger, "net_session: dropped datagram from unexpected peer {from}");
                            continue;
                        }
                        let bytes = buf[..n].to_vec();
                        if tx.send(NetEvent::Datagram { socket: id, channel: 0, bytes }).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => {
                        let _ = tx.send(NetEvent::Closed { socket: id });
                        break;
                    }
                }
            }
        });
        Ok(id)
    }

    /// Registers an already-connected TCP stream (plain or interleaved). The
    /// reader thread reads raw bytes; for `TcpInterleaved` it drains
    /// complete `$<channel><len16>` frames as they arrive and forwards the
    /// RTSP text remainder separately.
    pub fn register_tcp(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        mode: TransportMode,
    ) -> Result<SocketId, NetSessionError> {
        let id = self.alloc_id();
        let stream = Arc::new(Mutex::new(stream));
        self.sockets.lock()?.insert(
            id,
            SocketEntry { kind: SocketKind::Stream(stream.clone()), peer: Some(peer), mode },
        );

        let tx = self.tx_evt.clone();
        let logger = self.logger.clone();
        thread::spawn(move || {
            let mut pending = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let read_result = {
                    let mut guard = match stream.lock() {
                        Ok(g) => g,
                        Err(_) => break,
                    };
                    guard.read(&mut chunk)
                };
                match read_result {
                    Ok(0) => {
                        let _ = tx.send(NetEvent::Closed { socket: id });
                        break;
                    }
                    Ok(n) => {
                        pending.extend_from_slice(&chunk[..n]);
                        if mode == TransportMode::TcpInterleaved {
                            for event in drain_interleaved(&mut pending, id) {
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                        } else {
                            let bytes = std::mem::take(&mut pending);
                            if tx.send(NetEvent::Text { socket: id, bytes }).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => {
                        let _ = tx.send(NetEvent::Closed { socket: id });
                        break;
                    }
                }
            }
            sink_debug!(&logger, "net_session: reader for socket {} exiting", id.0);
        });
        Ok(id)
    }

    pub fn send_udp(&self, socket: SocketId, bytes: &[u8]) -> Result<usize, NetSessionError> {
        let sockets = self.sockets.lock()?;
        let entry = sockets.get(&socket).ok_or(NetSessionError::UnknownSocket(socket))?;
        match (&entry.kind, entry.peer) {
            (SocketKind::Udp(sock), Some(peer)) => Ok(sock.send_to(bytes, peer)?),
            (SocketKind::Udp(_), None) => Err(NetSessionError::NotUdp(socket)),
            _ => Err(NetSessionError::NotUdp(socket)),
        }
    }

    pub fn send_udp_to(&self, socket: SocketId, bytes: &[u8], to: SocketAddr) -> Result<usize, NetSessionError> {
        let sockets = self.sockets.lock()?;
        let entry = sockets.get(&socket).ok_or(NetSessionError::UnknownSocket(socket))?;
        match &entry.kind {
            SocketKind::Udp(sock) => Ok(sock.send_to(bytes, to)?),
            SocketKind::Stream(_) => Err(NetSessionError::NotUdp(socket)),
        }
    }

    pub fn send_text(&self, socket: SocketId, bytes: &[u8]) -> Result<(), NetSessionError> {
        let sockets = self.sockets.lock()?;
        let entry = sockets.get(&socket).ok_or(NetSessionError::UnknownSocket(socket))?;
        match &entry.kind {
            SocketKind::Stream(stream) => {
                stream.lock()?.write_all(bytes)?;
                Ok(())
            }
            SocketKind::Udp(_) => Err(NetSessionError::NotStream(socket)),
        }
    }

    /// Sends one interleaved binary frame (`$<channel><len16>` + payload) on
    /// a `TcpInterleaved` socket's shared connection.
    pub fn send_interleaved(&self, socket: SocketId, channel: u8, payload: &[u8]) -> Result<(), NetSessionError> {
        let sockets = self.sockets.lock()?;
        let entry = sockets.get(&socket).ok_or(NetSessionError::UnknownSocket(socket))?;
        match &entry.kind {
            SocketKind::Stream(stream) => {
                stream.lock()?.write_all(&encode_interleaved(channel, payload))?;
                Ok(())
            }
            SocketKind::Udp(_) => Err(NetSessionError::NotStream(socket)),
        }
    }

    #[must_use]
    pub fn mode_of(&self, socket: SocketId) -> Option<TransportMode> {
        self.sockets.lock().ok()?.get(&socket).map(|e| e.mode)
    }

    pub fn remove(&self, socket: SocketId) -> Result<(), NetSessionError> {
        self.sockets.lock()?.remove(&socket);
        Ok(())
    }

    /// Starts the dispatcher: `handle_one` runs on the one dispatch thread
    /// for every `NetEvent` pulled off the shared channel, in arrival order.
    pub fn start<F, T>(&mut self, rx_evt: Receiver<NetEvent>, handle_one: F, on_tick: T)
    where
        F: FnMut(NetEvent) + Send + 'static,
        T: FnMut() + Send + 'static,
    {
        self.looper = Some(Looper::start("net_session", rx_evt, handle_one, on_tick));
    }

    pub fn stop(&mut self) {
        if let Some(mut looper) = self.looper.take() {
            looper.stop(&self.logger);
        }
    }
}

/// Encodes one RFC 2326 §10.12 interleaved frame: `$`, channel id, 16-bit
/// big-endian payload length, payload.
#[must_use]
pub fn encode_interleaved(channel: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.push(b'$');
    out.push(channel);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Drains as many complete chunks (binary frames and/or RTSP text runs) out
/// of `buf` as are currently available, leaving any trailing partial frame
/// in place for the next read to complete. Text runs (anything before the
/// next `$`) are forwarded verbatim; the RTSP message parser is responsible
/// for finding message boundaries within them.
fn drain_interleaved(buf: &mut Vec<u8>, socket: SocketId) -> Vec<NetEvent> {
    let mut events = Vec::new();
    let mut consumed = 0usize;

    loop {
        let rest = &buf[consumed..];
        match rest.iter().position(|&b| b == b'$') {
            None => {
                if !rest.is_empty() {
                    events.push(NetEvent::Text { socket, bytes: rest.to_vec() });
                    consumed = buf.len();
                }
                break;
            }
            Some(dollar_at) => {
                if dollar_at > 0 {
                    events.push(NetEvent::Text { socket, bytes: rest[..dollar_at].to_vec() });
                    consumed += dollar_at;
                }
                let frame_start = &buf[consumed..];
                if frame_start.len() < 4 {
                    break; // header incomplete, wait for more bytes
                }
                let channel = frame_start[1];
                let len = u16::from_be_bytes([frame_start[2], frame_start[3]]) as usize;
                if frame_start.len() < 4 + len {
                    break; // payload incomplete
                }
                let payload = frame_start[4..4 + len].to_vec();
                events.push(NetEvent::Datagram { socket, channel, bytes: payload });
                consumed += 4 + len;
            }
        }
    }

    buf.drain(..consumed);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    use crate::log::NoopLogSink;

    fn logger() -> Arc<dyn LogSink> {
        Arc::new(NoopLogSink)
    }

    #[test]
    fn interleaved_frame_round_trips() {
        let frame = encode_interleaved(2, b"hello");
        assert_eq!(frame, [b'$', 2, 0, 5, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn drain_interleaved_splits_text_and_binary() {
        let id = SocketId(1);
        let mut buf = b"RTSP/1.0 200 OK\r\n\r\n".to_vec();
        buf.extend(encode_interleaved(0, b"rtp-bytes"));
        let events = drain_interleaved(&mut buf, id);
        assert_eq!(events.len(), 2);
        match &events[0] {
            NetEvent::Text { bytes, .. } => assert_eq!(bytes, b"RTSP/1.0 200 OK\r\n\r\n"),
            _ => panic!("expected text chunk first"),
        }
        match &events[1] {
            NetEvent::Datagram { channel, bytes, .. } => {
                assert_eq!(*channel, 0);
                assert_eq!(bytes, b"rtp-bytes");
            }
            _ => panic!("expected a binary frame second"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_interleaved_holds_back_incomplete_trailing_frame() {
        let id = SocketId(1);
        let mut buf = vec![b'$', 1, 0, 10, b'a', b'b']; // declares 10 bytes, only 2 present
        let events = drain_interleaved(&mut buf, id);
        assert!(events.is_empty());
        assert_eq!(buf.len(), 6); // untouched, waiting for more bytes
    }

    #[test]
    fn udp_datagram_round_trips_through_the_session() {
        let (session_a, _rx_a) = NetworkSession::new(logger());
        let (session_b, rx_b) = NetworkSession::new(logger());

        let id_b = session_b.register_udp("127.0.0.1:0", None).unwrap();
        let addr_b = {
            let sockets = session_b.sockets.lock().unwrap();
            match &sockets.get(&id_b).unwrap().kind {
                SocketKind::Udp(sock) => sock.local_addr().unwrap(),
                SocketKind::Stream(_) => unreachable!(),
            }
        };

        let id_a = session_a.register_udp("127.0.0.1:0", Some(addr_b)).unwrap();
        session_a.send_udp(id_a, b"ping").unwrap();

        let event = rx_b.recv_timeout(Duration::from_secs(2)).unwrap();
        match event {
            NetEvent::Datagram { bytes, .. } => assert_eq!(bytes, b"ping"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn plain_tcp_forwards_raw_bytes_as_text() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).unwrap();
        let (server_stream, peer) = listener.accept().unwrap();

        let (session, rx) = NetworkSession::new(logger());
        let id = session.register_tcp(server_stream, peer, TransportMode::Tcp).unwrap();

        let mut client = client;
        client.write_all(b"OPTIONS * RTSP/1.0\r\n\r\n").unwrap();

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match event {
            NetEvent::Text { socket, bytes } => {
                assert_eq!(socket, id);
                assert_eq!(bytes, b"OPTIONS * RTSP/1.0\r\n\r\n");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
