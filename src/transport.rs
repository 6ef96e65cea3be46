//! Transport adapter contract (C7, §4.5) plus concrete transports (§4.5.1):
//! TCP and Unix-domain-socket transports for talking to a real forwarder,
//! and an in-process loopback pair for tests.
//!
//! The framing half of this contract — "the transport is responsible for
//! element framing; the Face sees only full elements" — is grounded on the
//! teacher's `face/buffered.rs`: a growable receive buffer that repeatedly
//! tries `TLV::try_decode` on its prefix and shifts consumed bytes out
//! after a full element is taken.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::rc::Rc;

use crate::error::TransportError;
use crate::tlv::TLV;

/// The outcome of one `Transport::poll` call: zero or more fully-framed
/// elements, in arrival order, plus whether the peer has closed the
/// connection (§4.5's `on_closed` upcall, represented here as a return
/// value since this crate's Face drives the loop rather than being driven
/// by callbacks pushed from the transport).
#[derive(Debug, Default)]
pub struct PollResult {
    pub elements: Vec<Vec<u8>>,
    pub closed: bool,
}

pub trait Transport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn close(&mut self);
    fn connected_host(&self) -> Option<&str>;
    fn connected_port(&self) -> Option<u16>;
    fn is_open(&self) -> bool;
    /// Reads whatever bytes are currently available and runs them through
    /// the element framer. Non-blocking: an empty `PollResult` means
    /// "nothing new", not an error.
    fn poll(&mut self) -> Result<PollResult, TransportError>;
}

/// Maximum single element size the framer accepts before treating it as a
/// malformed stream (mirrors the teacher's `MAX_PACKET_SIZE` bound in
/// `face/buffered.rs`, sized generously since this crate has no fixed MTU
/// assumption the way a datagram face does).
const MAX_ELEMENT_SIZE: usize = 64 * 1024;

/// Shared element-framing logic: feed it raw bytes, get back zero or more
/// complete TLV elements plus the bytes not yet consumed.
#[derive(Default)]
struct Framer {
    buffer: Vec<u8>,
}

impl Framer {
    fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, TransportError> {
        self.buffer.extend_from_slice(bytes);
        let mut elements = Vec::new();
        loop {
            match TLV::try_decode(&self.buffer) {
                Ok((_, consumed)) => {
                    elements.push(self.buffer[..consumed].to_vec());
                    self.buffer.drain(..consumed);
                }
                Err(_) => {
                    if self.buffer.len() > MAX_ELEMENT_SIZE {
                        return Err(TransportError("element exceeds maximum size".into()));
                    }
                    break;
                }
            }
        }
        Ok(elements)
    }
}

/// TCP transport to a remote forwarder (§6: "Remote forwarder: TCP to
/// `host:port`, default port 6363"). Grounded on the teacher's
/// `platform/native/tcp.rs`: non-blocking stream, `WouldBlock` means
/// "nothing available" rather than an error, any other I/O error is a
/// disconnect.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    host: Option<String>,
    port: Option<u16>,
    framer: Framer,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self { stream: None, host: None, port: None, framer: Framer::default() }
    }
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let stream = TcpStream::connect((host, port)).map_err(|e| TransportError(e.to_string()))?;
        stream.set_nonblocking(true).map_err(|e| TransportError(e.to_string()))?;
        self.stream = Some(stream);
        self.host = Some(host.to_string());
        self.port = Some(port);
        self.framer = Framer::default();
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or_else(|| TransportError("not connected".into()))?;
        stream.write_all(bytes).map_err(|e| TransportError(e.to_string()))
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn connected_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn connected_port(&self) -> Option<u16> {
        self.port
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn poll(&mut self) -> Result<PollResult, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(PollResult::default());
        };

        let mut buf = [0u8; 4096];
        let mut chunk = Vec::new();
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    self.stream = None;
                    let elements = self.framer.feed(&chunk)?;
                    return Ok(PollResult { elements, closed: true });
                }
                Ok(n) => chunk.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.stream = None;
                    return Err(TransportError(e.to_string()));
                }
            }
        }
        let elements = self.framer.feed(&chunk)?;
        Ok(PollResult { elements, closed: false })
    }
}

/// Unix-domain-socket transport to a local forwarder (§6: "Local forwarder:
/// unspecified path... this implementation uses Unix domain sockets on unix
/// platforms"). Grounded on the teacher's `platform/native/unix.rs`
/// `unix_stream_face`: non-blocking stream, `WouldBlock` means "nothing
/// available", any other I/O error is a disconnect.
///
/// The `Transport::connect` signature takes `(host, port)` to stay uniform
/// across transports; for a Unix socket `host` is read as the filesystem
/// path and `port` is ignored.
#[cfg(unix)]
pub struct UnixTransport {
    stream: Option<std::os::unix::net::UnixStream>,
    path: Option<String>,
    framer: Framer,
}

#[cfg(unix)]
impl Default for UnixTransport {
    fn default() -> Self {
        Self { stream: None, path: None, framer: Framer::default() }
    }
}

#[cfg(unix)]
impl UnixTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
impl Transport for UnixTransport {
    fn connect(&mut self, host: &str, _port: u16) -> Result<(), TransportError> {
        let stream = std::os::unix::net::UnixStream::connect(host)
            .map_err(|e| TransportError(e.to_string()))?;
        stream.set_nonblocking(true).map_err(|e| TransportError(e.to_string()))?;
        self.stream = Some(stream);
        self.path = Some(host.to_string());
        self.framer = Framer::default();
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or_else(|| TransportError("not connected".into()))?;
        stream.write_all(bytes).map_err(|e| TransportError(e.to_string()))
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn connected_host(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn connected_port(&self) -> Option<u16> {
        None
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn poll(&mut self) -> Result<PollResult, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(PollResult::default());
        };

        let mut buf = [0u8; 4096];
        let mut chunk = Vec::new();
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    self.stream = None;
                    let elements = self.framer.feed(&chunk)?;
                    return Ok(PollResult { elements, closed: true });
                }
                Ok(n) => chunk.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.stream = None;
                    return Err(TransportError(e.to_string()));
                }
            }
        }
        let elements = self.framer.feed(&chunk)?;
        Ok(PollResult { elements, closed: false })
    }
}

type ByteQueue = Rc<RefCell<VecDeque<u8>>>;

/// In-process loopback transport for tests (§4.5.1). Grounded on the
/// teacher's `face/local.rs`/`platform/native/local.rs` ring buffer, here
/// simplified to a single-threaded `Rc<RefCell<VecDeque<u8>>>` pair since
/// tests pump the whole Face on one thread rather than across threads.
pub struct LoopbackTransport {
    outbox: ByteQueue,
    inbox: ByteQueue,
    host: Option<String>,
    port: Option<u16>,
    framer: Framer,
    peer_closed: Rc<RefCell<bool>>,
    self_closed: Rc<RefCell<bool>>,
}

/// Builds a connected pair of loopback transports: bytes sent on one side
/// arrive on the other. Both ends start already "connected" to a
/// placeholder host/port since loopback tests never go through host
/// probing.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    let a_closed = Rc::new(RefCell::new(false));
    let b_closed = Rc::new(RefCell::new(false));

    let a = LoopbackTransport {
        outbox: a_to_b.clone(),
        inbox: b_to_a.clone(),
        host: Some("loopback".to_string()),
        port: Some(0),
        framer: Framer::default(),
        peer_closed: b_closed.clone(),
        self_closed: a_closed.clone(),
    };
    let b = LoopbackTransport {
        outbox: b_to_a,
        inbox: a_to_b,
        host: Some("loopback".to_string()),
        port: Some(0),
        framer: Framer::default(),
        peer_closed: a_closed,
        self_closed: b_closed,
    };
    (a, b)
}

impl Transport for LoopbackTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.host = Some(host.to_string());
        self.port = Some(port);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if *self.self_closed.borrow() {
            return Err(TransportError("transport closed".into()));
        }
        self.outbox.borrow_mut().extend(bytes.iter().copied());
        Ok(())
    }

    fn close(&mut self) {
        *self.self_closed.borrow_mut() = true;
    }

    fn connected_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn connected_port(&self) -> Option<u16> {
        self.port
    }

    fn is_open(&self) -> bool {
        !*self.self_closed.borrow()
    }

    fn poll(&mut self) -> Result<PollResult, TransportError> {
        let chunk: Vec<u8> = self.inbox.borrow_mut().drain(..).collect();
        let elements = self.framer.feed(&chunk)?;
        Ok(PollResult { elements, closed: *self.peer_closed.borrow() })
    }
}
