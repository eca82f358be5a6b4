//! Streamed stats payload decoding.
//!
//! The stats endpoint hands back a body stream even for single-sample
//! requests. The stream must be fully consumed and released on every path,
//! including chunk-read and decode failures, before the decoded value is
//! returned.

use futures::StreamExt;

use crate::model::ContainerStats;
use crate::runtime::{ByteStream, ClientError};

/// Consume a stats payload stream to completion, release it, then decode.
///
/// Taking the stream by value guarantees the handle is dropped on every exit
/// path; the explicit `drop` before decoding makes the release precede any
/// decode outcome.
pub async fn decode_stats(mut stream: ByteStream) -> Result<ContainerStats, ClientError> {
    let mut payload = Vec::new();
    while let Some(chunk) = stream.next().await {
        payload.extend_from_slice(&chunk?);
    }
    drop(stream);

    Ok(serde_json::from_slice(&payload)?)
}
