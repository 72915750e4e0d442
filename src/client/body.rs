//! Response body with a close callback.
//!
//! [`ResponseBody`] records every chunk the consumer reads. When the body is
//! closed, by reading it to the end, calling [`ResponseBody::close`], or
//! dropping it, the injected [`OnClose`] callback runs exactly once with the
//! captured bytes.

use std::fmt;

use bytes::Bytes;

use crate::Result;

/// What the consumer read before the body was closed.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    /// Every byte read so far
    pub bytes: Bytes,
    /// `true` if the body was read to end-of-stream
    pub complete: bool,
}

/// Callback run once when a body is closed.
pub type OnClose = Box<dyn FnOnce(CapturedBody) + Send>;

enum Source {
    Network(reqwest::Response),
    Buffered(Option<Bytes>),
}

struct Capture {
    buffer: Vec<u8>,
    on_close: OnClose,
}

/// A streaming response body.
pub struct ResponseBody {
    source: Source,
    capture: Option<Capture>,
    finished: bool,
}

impl ResponseBody {
    /// Wrap a live network response.
    pub fn network(response: reqwest::Response, on_close: Option<OnClose>) -> Self {
        Self::with_source(Source::Network(response), on_close)
    }

    /// A body already held in memory.
    pub fn buffered(bytes: Bytes, on_close: Option<OnClose>) -> Self {
        Self::with_source(Source::Buffered(Some(bytes)), on_close)
    }

    fn with_source(source: Source, on_close: Option<OnClose>) -> Self {
        Self {
            source,
            capture: on_close.map(|on_close| Capture {
                buffer: Vec::new(),
                on_close,
            }),
            finished: false,
        }
    }

    /// Read the next chunk; `None` at end-of-stream.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        let next = match &mut self.source {
            Source::Network(response) => response.chunk().await?,
            Source::Buffered(bytes) => bytes.take().filter(|b| !b.is_empty()),
        };

        match &next {
            Some(chunk) => {
                if let Some(capture) = self.capture.as_mut() {
                    capture.buffer.extend_from_slice(chunk);
                }
            }
            None => {
                self.finished = true;
                self.fire();
            }
        }
        Ok(next)
    }

    /// Read the remaining body.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut out = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(out))
    }

    /// Close without reading further.
    pub fn close(mut self) {
        self.fire();
    }

    /// Returns `true` once end-of-stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn fire(&mut self) {
        if let Some(capture) = self.capture.take() {
            (capture.on_close)(CapturedBody {
                bytes: Bytes::from(capture.buffer),
                complete: self.finished,
            });
        }
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            Source::Network(_) => "network",
            Source::Buffered(_) => "buffered",
        };
        f.debug_struct("ResponseBody")
            .field("source", &source)
            .field("capturing", &self.capture.is_some())
            .field("finished", &self.finished)
            .finish()
    }
}
