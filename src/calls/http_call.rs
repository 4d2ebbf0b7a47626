//! # HTTP-backed call.
//!
//! [`HttpCall`] keeps a prepared [`reqwest::RequestBuilder`] and sends a clone of it on
//! every attempt, so restarting an [`AsyncOp`](crate::AsyncOp) re-sends the same request.
//!
//! ## Status mapping
//! - 2xx with a JSON body that decodes into `V` → success with the response status
//! - 2xx with an undecodable body → failure with the response status
//! - any other status → failure carrying the response body text
//! - transport errors (connect, timeout, ...) → failure with `503 Service Unavailable`
//!
//! Requests with streaming bodies cannot be cloned; issuing them fails with
//! `500 Internal Server Error`.

use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use http::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::calls::call::{BoxCallFuture, Call, CallFailure, CallResponse};

/// Call that sends a prepared HTTP request and decodes its JSON response.
pub struct HttpCall<V> {
    request: Mutex<reqwest::RequestBuilder>,
    _value: PhantomData<fn() -> V>,
}

impl<V> HttpCall<V> {
    /// Wraps a prepared request.
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self {
            request: Mutex::new(request),
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for HttpCall<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCall").finish_non_exhaustive()
    }
}

impl<V> Call<V> for HttpCall<V>
where
    V: DeserializeOwned + Send + 'static,
{
    fn issue(&self, ctx: CancellationToken) -> BoxCallFuture<V> {
        let request = self
            .request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone();

        Box::pin(async move {
            let Some(request) = request else {
                return Err(CallFailure::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "request body cannot be cloned",
                ));
            };

            let response = tokio::select! {
                res = request.send() => res.map_err(transport_failure)?,
                _ = ctx.cancelled() => {
                    return Err(CallFailure::new(StatusCode::SERVICE_UNAVAILABLE, "request cancelled"));
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CallFailure::new(status, body));
            }

            match response.json::<V>().await {
                Ok(value) => Ok(CallResponse::new(status, value)),
                Err(e) => Err(CallFailure::new(status, format!("invalid response body: {e}"))),
            }
        })
    }
}

fn transport_failure(e: reqwest::Error) -> CallFailure {
    CallFailure::new(
        e.status().unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
        e.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::AsyncOp;
    use crate::calls::SignalState;
    use serde::Deserialize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Fleet {
        vehicles: u32,
    }

    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/fleet")
    }

    #[tokio::test]
    async fn decodes_json_on_success() {
        let url = serve_once("200 OK", r#"{"vehicles":12}"#).await;
        let op = AsyncOp::new(
            "fleet",
            std::sync::Arc::new(HttpCall::<Fleet>::new(reqwest::Client::new().get(url))),
        )
        .unwrap();

        op.start();
        assert_eq!(op.signal().settled().await, SignalState::Resolved);
        assert_eq!(op.result().unwrap(), Fleet { vehicles: 12 });
        assert_eq!(op.status_code().unwrap(), StatusCode::OK);
    }

    #[tokio::test]
    async fn error_status_becomes_failure() {
        let url = serve_once("404 Not Found", r#"{"error":"no fleet"}"#).await;
        let op = AsyncOp::new(
            "fleet",
            std::sync::Arc::new(HttpCall::<Fleet>::new(reqwest::Client::new().get(url))),
        )
        .unwrap();

        op.start();
        op.signal().settled().await;
        assert!(op.has_error());
        assert_eq!(op.status_code().unwrap(), StatusCode::NOT_FOUND);
        assert!(op.error().unwrap().contains("no fleet"));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_service_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let call = HttpCall::<Fleet>::new(reqwest::Client::new().get(format!("http://{addr}/")));
        let err = call.issue(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
