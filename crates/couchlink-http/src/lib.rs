//! # couchlink http
//!
//! Transport abstraction for couchlink. The client facade talks to the store
//! only through the [`HttpClient`] trait, so the transport can be swapped.
//!
//! ## Key Types
//!
//! - [`HttpClient`] - The async trait every transport implements
//! - [`HttpRequest`] / [`HttpResponse`] - Owned request and response values
//! - [`ScriptedClient`] - Replays queued responses and records requests
//! - [`MemoryServer`] - In-memory CouchDB emulation for end-to-end tests
//! - `ReqwestClient` - Real network transport, behind the `reqwest` feature
//!
//! ## Design Notes
//!
//! - **Statuses are data**: a `404` or `409` is an `Ok(HttpResponse)`.
//!   [`TransportError`] means no response was produced.
//! - **One-time configuration**: timeout and authorization are set once,
//!   when the client facade is constructed.

pub mod error;
pub mod memory;
pub mod message;
pub mod scripted;
pub mod traits;

#[cfg(feature = "reqwest")]
pub mod reqwest;

pub use error::{Result, TransportError};
pub use memory::{MapFn, MemoryServer};
pub use message::{reason_phrase, HttpRequest, HttpResponse, Method, APPLICATION_JSON};
pub use scripted::ScriptedClient;
pub use traits::{HttpClient, HttpClientExt};

#[cfg(feature = "reqwest")]
pub use crate::reqwest::ReqwestClient;
