//! TCP front end for the key registry
//!
//! Maps store outcomes onto response statuses: a missing key becomes
//! NOT_FOUND, a taken key becomes CONFLICT.

use crate::protocol::{
    OpCode, ProtocolError, Request, RequestHeader, Response, Status, REQUEST_HEADER_LEN,
};
use anyhow::{Context, Result};
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use urlstore_core::{StoreError, UrlStore};

/// urlstore TCP server
pub struct UrlStoreServer {
    store: Arc<UrlStore>,
    max_frame_bytes: usize,
}

impl UrlStoreServer {
    pub fn new(store: Arc<UrlStore>, max_frame_bytes: usize) -> Self {
        Self {
            store,
            max_frame_bytes,
        }
    }

    /// Accept connections until the listener fails
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Listening on {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New client connection from {}", addr);
                    let store = self.store.clone();
                    let max_frame_bytes = self.max_frame_bytes;

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(store, stream, max_frame_bytes).await {
                            warn!("Client {} error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Translate the outcome of the spawned accept loop into the process result.
///
/// A failed or panicked server task is logged and returned as an error so the
/// process exits non-zero.
pub fn server_exit(result: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match result {
        Ok(Ok(())) => {
            info!("Server completed normally");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Server error: {:?}", e);
            Err(e)
        }
        Err(e) => {
            error!("Server task error: {}", e);
            Err(e).context("Server task failed")
        }
    }
}

/// Serve one connection until the peer disconnects
pub async fn handle_client<S>(store: Arc<UrlStore>, mut stream: S, max_frame_bytes: usize) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let mut header_buf = [0u8; REQUEST_HEADER_LEN];
        match stream.read_exact(&mut header_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Client disconnected");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let header = RequestHeader::decode(&header_buf);

        // Oversized bodies are never read; the connection is dropped after replying
        if header.body_len() > max_frame_bytes {
            let err = ProtocolError::FrameTooLarge {
                len: header.body_len(),
                max: max_frame_bytes,
            };
            warn!("Rejecting request seq={}: {}", header.seq, err);
            let response = Response::new(Status::BadRequest, header.seq, err.to_string());
            stream.write_all(&response.to_bytes()).await?;
            stream.flush().await?;
            break;
        }

        let mut key = vec![0u8; header.key_len as usize];
        stream.read_exact(&mut key).await?;
        let mut value = vec![0u8; header.val_len as usize];
        stream.read_exact(&mut value).await?;

        let response = match OpCode::try_from(header.opcode) {
            Ok(opcode) => {
                let request = Request {
                    opcode,
                    seq: header.seq,
                    key: Bytes::from(key),
                    value: Bytes::from(value),
                };
                handle_request(&store, &request)
            }
            Err(e) => {
                warn!("seq={}: {}", header.seq, e);
                Response::new(Status::BadRequest, header.seq, e.to_string())
            }
        };

        stream.write_all(&response.to_bytes()).await?;
        stream.flush().await?;
    }

    Ok(())
}

/// Execute one decoded request against the store
pub fn handle_request(store: &UrlStore, request: &Request) -> Response {
    let seq = request.seq;

    let result = match request.opcode {
        OpCode::Ping => Ok(Response::new(Status::Ok, seq, "pong")),
        OpCode::Get => request.key_str().map(|key| match store.get(key) {
            Some(value) => Response::new(Status::Ok, seq, value),
            None => Response::empty(Status::NotFound, seq),
        }),
        OpCode::Set => request.key_str().and_then(|key| {
            let value = request.value_str()?;
            Ok(if store.set_if_absent(key, value) {
                Response::empty(Status::Ok, seq)
            } else {
                Response::empty(Status::Conflict, seq)
            })
        }),
        OpCode::Put => request.value_str().map(|value| match store.put(value) {
            Ok(key) => Response::new(Status::Ok, seq, key),
            Err(e @ StoreError::KeySpaceExhausted { .. }) => {
                Response::new(Status::Exhausted, seq, e.to_string())
            }
            Err(e) => Response::new(Status::BadRequest, seq, e.to_string()),
        }),
        OpCode::Stats => match serde_json::to_vec(&store.stats()) {
            Ok(json) => Ok(Response::new(Status::Ok, seq, json)),
            Err(e) => {
                error!("Failed to encode stats: {}", e);
                Ok(Response::empty(Status::BadRequest, seq))
            }
        },
    };

    result.unwrap_or_else(|e| {
        debug!("seq={}: {}", seq, e);
        Response::new(Status::BadRequest, seq, e.to_string())
    })
}
