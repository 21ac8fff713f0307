use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use super::config::DeviceConfig;
use super::transport::{Port, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Everything written is read back.
    Echo,
    /// Only the scripted response bytes are ever readable.
    Scripted,
    /// Reads end the stream immediately.
    Eof,
    /// Writes fail as if the cable was pulled.
    BrokenWrite,
    /// Writes never complete.
    StalledWrite,
}

#[derive(Default)]
struct Shared {
    written: Vec<u8>,
    opens: usize,
    live: usize,
}

/// In-memory transport for tests. All ports opened from one transport
/// share the write log.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    behavior: Behavior,
    response: Vec<u8>,
    fail_open: bool,
    shared: Arc<Mutex<Shared>>,
}

impl FakeTransport {
    fn with(behavior: Behavior, response: &[u8]) -> Self {
        Self {
            behavior,
            response: response.to_vec(),
            fail_open: false,
            shared: Arc::default(),
        }
    }

    pub(crate) fn echo() -> Self {
        Self::with(Behavior::Echo, b"")
    }

    /// A device that never answers.
    pub(crate) fn silent() -> Self {
        Self::with(Behavior::Scripted, b"")
    }

    pub(crate) fn scripted(response: &str) -> Self {
        Self::with(Behavior::Scripted, response.as_bytes())
    }

    pub(crate) fn scripted_bytes(response: &[u8]) -> Self {
        Self::with(Behavior::Scripted, response)
    }

    pub(crate) fn eof() -> Self {
        Self::with(Behavior::Eof, b"")
    }

    pub(crate) fn broken_write() -> Self {
        Self::with(Behavior::BrokenWrite, b"")
    }

    pub(crate) fn stalled_write() -> Self {
        Self::with(Behavior::StalledWrite, b"")
    }

    pub(crate) fn absent() -> Self {
        Self {
            fail_open: true,
            ..Self::silent()
        }
    }

    pub(crate) fn written(&self) -> String {
        let shared = self.shared.lock().unwrap();
        String::from_utf8_lossy(&shared.written).to_string()
    }

    pub(crate) fn opens(&self) -> usize {
        self.shared.lock().unwrap().opens
    }

    /// Number of opened ports not yet dropped.
    pub(crate) fn live(&self) -> usize {
        self.shared.lock().unwrap().live
    }
}

impl Transport for FakeTransport {
    fn open(&self, config: &DeviceConfig) -> tokio_serial::Result<Box<dyn Port>> {
        if self.fail_open {
            return Err(tokio_serial::Error::new(
                tokio_serial::ErrorKind::NoDevice,
                format!("{}: no such device", config.port),
            ));
        }
        let mut shared = self.shared.lock().unwrap();
        shared.opens += 1;
        shared.live += 1;
        Ok(Box::new(FakePort {
            behavior: self.behavior,
            read_buf: self.response.iter().copied().collect(),
            shared: self.shared.clone(),
        }))
    }
}

pub(crate) struct FakePort {
    behavior: Behavior,
    read_buf: VecDeque<u8>,
    shared: Arc<Mutex<Shared>>,
}

impl Drop for FakePort {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.live -= 1;
        }
    }
}

impl tokio::io::AsyncRead for FakePort {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.behavior == Behavior::Eof {
            return Poll::Ready(Ok(()));
        }
        if self.read_buf.is_empty() {
            // Nothing will ever arrive; callers rely on their timeout.
            return Poll::Pending;
        }
        let c = buf.remaining().min(self.read_buf.len());
        let chunk: Vec<u8> = self.read_buf.drain(0..c).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakePort {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::result::Result<usize, std::io::Error>> {
        if self.behavior == Behavior::BrokenWrite {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        if self.behavior == Behavior::StalledWrite {
            return Poll::Pending;
        }
        self.shared.lock().unwrap().written.extend_from_slice(buf);
        if self.behavior == Behavior::Echo {
            self.read_buf.extend(buf.iter().copied());
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }
}
