//! Topic query client.
//!
//! Opens one TCP connection per query. The client holds only the target
//! address, so a single instance can be shared across concurrent callers.

use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{TopicError, TopicResult};
use crate::packet::{self, HEADER_LEN};

/// Boxed future alias for topic query results.
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = TopicResult<Vec<u8>>> + Send + 'a>>;

/// Executes a textual query against an upstream game server.
///
/// Implementations must be safe for concurrent use. Deadlines are applied
/// by the caller; dropping the returned future abandons the exchange and
/// releases its resources.
pub trait QueryTransport: Send + Sync {
    /// Send `query` and return the raw response body.
    ///
    /// `expect_response` is forwarded unchanged from the caller.
    fn query<'a>(&'a self, query: &'a [u8], expect_response: bool) -> QueryFuture<'a>;
}

/// Topic protocol client bound to a single `host:port`.
#[derive(Debug, Clone)]
pub struct QueryClient {
    addr: String,
}

impl QueryClient {
    /// Create a client for the given address. No connection is made yet.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The address queries are sent to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn exchange(&self, query: &[u8], expect_response: bool) -> TopicResult<Vec<u8>> {
        let request = packet::encode_query(query)?;

        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| TopicError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        debug!(addr = %self.addr, "topic connection established");

        stream.write_all(&request).await?;
        if !expect_response {
            return Ok(Vec::new());
        }

        let mut header = [0u8; HEADER_LEN];
        read_frame(&mut stream, &mut header).await?;
        let len = packet::decode_header(&header)?;

        let mut body = vec![0u8; len];
        read_frame(&mut stream, &mut body).await?;
        let response = packet::decode_body(&body)?;

        debug!(addr = %self.addr, len, kind = response.kind(), "topic response received");
        Ok(response.into_bytes())
    }
}

impl QueryTransport for QueryClient {
    fn query<'a>(&'a self, query: &'a [u8], expect_response: bool) -> QueryFuture<'a> {
        Box::pin(self.exchange(query, expect_response))
    }
}

async fn read_frame(stream: &mut TcpStream, buf: &mut [u8]) -> TopicResult<()> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(TopicError::ConnectionClosed),
        Err(e) => Err(e.into()),
    }
}
