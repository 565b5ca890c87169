// src/client/mod.rs
//! Chat front-end state and transport, shared by the terminal client and the
//! integration tests.

pub mod decoder;
pub mod store;
pub mod transport;

pub use store::{MessageStore, StoreEvent, ERROR_MESSAGE, GREETING};
pub use transport::{ChatTransport, TransportError};
