//! byond-topic — client for the BYOND topic protocol.
//!
//! A BYOND game server answers "world topic" queries on its game port.
//! Each exchange is a single framed request followed by a single framed
//! response over a fresh TCP connection.
//!
//! # Architecture
//!
//! ```text
//! QueryTransport (trait)
//!   └── QueryClient
//!         ├── packet::encode_query()  → request frame
//!         ├── TcpStream exchange
//!         └── packet::decode_body()   → Response (null / float / text)
//! ```
//!
//! Callers bound an exchange by wrapping the returned future in a timeout.
//! Dropping the future closes the connection.

pub mod client;
pub mod error;
pub mod packet;

pub use client::{QueryClient, QueryFuture, QueryTransport};
pub use error::{TopicError, TopicResult};
pub use packet::Response;
