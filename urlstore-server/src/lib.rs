//! urlstore server - TCP access to the key registry

pub mod protocol;
pub mod server;

pub use protocol::{OpCode, ProtocolError, Request, Response, Status};
pub use server::{handle_client, handle_request, server_exit, UrlStoreServer};
