//! Scripted network doubles for testing.
//!
//! [`ScriptedChannel`] replays a queue of datagrams and timeouts and records
//! everything sent through it.  [`MockChannelProvider`] hands out clones of
//! one scripted channel and fakes the host's interface list.  Clones share
//! state, so a test can keep a handle and inspect it after the service under
//! test has consumed its own copy.

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::{ChannelProvider, FrameChannel, NetworkInterface};

/// Source address used by [`ScriptedChannel::push_datagram`].
pub const DEFAULT_PEER: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 10), 34569));

/// One scripted receive result.
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    Datagram { bytes: Vec<u8>, from: SocketAddr },
    Timeout,
    Error(io::ErrorKind),
}

/// A frame sent through a [`ScriptedChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub bytes: Vec<u8>,
    pub dest: SocketAddrV4,
}

#[derive(Debug, Default)]
struct ChannelState {
    script: VecDeque<ScriptedEvent>,
    sent: Vec<SentFrame>,
    waits: Vec<Duration>,
}

/// A [`FrameChannel`] that replays a script.
///
/// Once the script is exhausted every receive times out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a datagram from [`DEFAULT_PEER`].
    pub fn push_datagram(&self, bytes: impl Into<Vec<u8>>) {
        self.push_datagram_from(bytes, DEFAULT_PEER);
    }

    pub fn push_datagram_from(&self, bytes: impl Into<Vec<u8>>, from: SocketAddr) {
        self.push(ScriptedEvent::Datagram {
            bytes: bytes.into(),
            from,
        });
    }

    pub fn push_timeout(&self) {
        self.push(ScriptedEvent::Timeout);
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.push(ScriptedEvent::Error(kind));
    }

    fn push(&self, event: ScriptedEvent) {
        self.state.lock().expect("lock poisoned").script.push_back(event);
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.state.lock().expect("lock poisoned").sent.clone()
    }

    /// The timeout passed to every `recv_from` call so far.
    pub fn waits(&self) -> Vec<Duration> {
        self.state.lock().expect("lock poisoned").waits.clone()
    }

    /// Scripted events not consumed yet.
    pub fn remaining(&self) -> usize {
        self.state.lock().expect("lock poisoned").script.len()
    }
}

impl FrameChannel for ScriptedChannel {
    fn send_to(&mut self, frame: &[u8], dest: SocketAddrV4) -> io::Result<usize> {
        self.state.lock().expect("lock poisoned").sent.push(SentFrame {
            bytes: frame.to_vec(),
            dest,
        });
        Ok(frame.len())
    }

    fn recv_from(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, SocketAddr)> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.waits.push(timeout);
        match state.script.pop_front() {
            Some(ScriptedEvent::Datagram { bytes, from }) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok((len, from))
            }
            Some(ScriptedEvent::Error(kind)) => Err(io::Error::new(kind, "scripted error")),
            Some(ScriptedEvent::Timeout) | None => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "scripted timeout"))
            }
        }
    }
}

/// A [`ChannelProvider`] serving one shared [`ScriptedChannel`].
#[derive(Debug, Clone)]
pub struct MockChannelProvider {
    channel: ScriptedChannel,
    interfaces: Option<Vec<NetworkInterface>>,
    local_address: Ipv4Addr,
    open_error: Option<io::ErrorKind>,
    opened: Arc<Mutex<Vec<(u16, Option<String>)>>>,
}

impl MockChannelProvider {
    /// A host with a single `eth0` at `192.168.1.23`.
    pub fn new(channel: ScriptedChannel) -> Self {
        let local_address = Ipv4Addr::new(192, 168, 1, 23);
        Self {
            channel,
            interfaces: Some(vec![NetworkInterface::new("eth0", Some(local_address))]),
            local_address,
            open_error: None,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_interfaces(mut self, interfaces: Vec<NetworkInterface>) -> Self {
        self.interfaces = Some(interfaces);
        self
    }

    /// Makes `interfaces()` report [`io::ErrorKind::Unsupported`].
    pub fn without_interface_support(mut self) -> Self {
        self.interfaces = None;
        self
    }

    pub fn with_local_address(mut self, address: Ipv4Addr) -> Self {
        self.local_address = address;
        self
    }

    /// Makes every `open()` fail with `kind`.
    pub fn failing_open(mut self, kind: io::ErrorKind) -> Self {
        self.open_error = Some(kind);
        self
    }

    pub fn channel(&self) -> &ScriptedChannel {
        &self.channel
    }

    /// `(port, interface)` of every successful `open()` call.
    pub fn opened(&self) -> Vec<(u16, Option<String>)> {
        self.opened.lock().expect("lock poisoned").clone()
    }
}

impl ChannelProvider for MockChannelProvider {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        self.interfaces
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "no interface support"))
    }

    fn open(&self, port: u16, interface: Option<&NetworkInterface>) -> io::Result<Box<dyn FrameChannel>> {
        if let Some(kind) = self.open_error {
            return Err(io::Error::new(kind, "scripted open failure"));
        }
        self.opened
            .lock()
            .expect("lock poisoned")
            .push((port, interface.map(|iface| iface.name.clone())));
        Ok(Box::new(self.channel.clone()))
    }

    fn local_address(&self) -> io::Result<Ipv4Addr> {
        Ok(self.local_address)
    }
}
