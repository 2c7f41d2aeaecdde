//! TCP front end: accept loop plus one task per connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, info, warn};

use super::handler::{Flow, RequestHandler};
use crate::protocol::Response;

/// Longest request line accepted, newline excluded.
pub const MAX_LINE_LENGTH: usize = 1 << 20;

/// Pause after a failed accept that is not tied to a single peer (e.g. EMFILE).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    /// Caps concurrently served connections when set.
    slots: Option<Arc<Semaphore>>,
    max_line: usize,
}

impl Server {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        handler: Arc<RequestHandler>,
        max_connections: Option<usize>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handler,
            slots: max_connections.map(|n| Arc::new(Semaphore::new(n))),
            max_line: MAX_LINE_LENGTH,
        })
    }

    /// Override the request line limit.
    pub fn with_max_line_length(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` turns true. Open connections finish on their own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "listening");

        loop {
            if *shutdown.borrow() {
                break;
            }

            // wait for a free slot before accepting, so excess clients queue in the backlog
            let permit = match &self.slots {
                Some(slots) => tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    permit = Arc::clone(slots).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            let (stream, peer) = tokio::select! {
                changed = shutdown.changed() => {
                    // sender dropped
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        if let Some(pause) = accept_backoff(&e) {
                            tokio::time::sleep(pause).await;
                        }
                        continue;
                    }
                },
            };

            let handler = Arc::clone(&self.handler);
            let max_line = self.max_line;
            tokio::spawn(async move {
                let _permit = permit;
                debug!(%peer, "connection opened");
                if let Err(e) = serve_connection(stream, &handler, max_line).await {
                    error!(%peer, error = %e, "connection failed");
                }
                debug!(%peer, "connection closed");
            });
        }

        info!("server stopped");
        Ok(())
    }
}

/// How long to wait before accepting again, if at all.
///
/// Errors that belong to one aborted peer are retried at once. Anything else
/// (fd exhaustion, out of memory) would fail again immediately.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}

/// Read request lines until EOF or `close`, answering each in order.
///
/// A line longer than `max_line` gets an error response and ends the
/// connection, since the rest of it cannot be told apart from the next request.
async fn serve_connection(
    stream: TcpStream,
    handler: &RequestHandler,
    max_line: usize,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let limit = u64::try_from(max_line).unwrap_or(u64::MAX).saturating_add(1);

    loop {
        buf.clear();
        let read = (&mut reader).take(limit).read_until(b'\n', &mut buf).await?;
        if read == 0 {
            break;
        }

        let terminated = buf.last() == Some(&b'\n');
        if terminated {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > max_line {
            warn!(max_line, "request line too long");
            let response = Response::error(format!("request line exceeds {max_line} bytes"));
            respond(&mut writer, &response).await?;
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(_) => {
                respond(&mut writer, &Response::error("request is not valid UTF-8")).await?;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (response, flow) = handler.handle_line(line).await;
        respond(&mut writer, &response).await?;

        if flow == Flow::Close {
            break;
        }
    }

    writer.shutdown().await
}

async fn respond(writer: &mut OwnedWriteHalf, response: &Response) -> io::Result<()> {
    let mut encoded = response.to_line().map_err(io::Error::other)?;
    encoded.push('\n');
    writer.write_all(encoded.as_bytes()).await?;
    writer.flush().await
}
