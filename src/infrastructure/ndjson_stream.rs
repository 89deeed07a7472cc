// Chunked NDJSON streaming utilities
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::watch;

/// Create a chunked response with one JSON document per line
pub fn ndjson_response<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let byte_stream = stream.map(|msg| serialize_line(&msg));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single message to a newline-terminated chunk
fn serialize_line<T: Serialize>(msg: &T) -> Result<Bytes, serde_json::Error> {
    let mut chunk = BytesMut::with_capacity(256);
    serde_json::to_writer((&mut chunk).writer(), msg)?;
    chunk.put_u8(b'\n');
    Ok(chunk.freeze())
}

/// Current value first, then every update until the sender goes away.
pub fn watch_updates<T>(mut rx: watch::Receiver<T>) -> impl Stream<Item = T>
where
    T: Clone + Send + Sync + 'static,
{
    async_stream::stream! {
        let current = rx.borrow_and_update().clone();
        yield current;

        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            yield next;
        }
    }
}

/// Helper to create a streaming response from a watch receiver
pub fn stream_from_watch<T>(rx: watch::Receiver<T>) -> impl IntoResponse
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    match ndjson_response(watch_updates(rx)) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
