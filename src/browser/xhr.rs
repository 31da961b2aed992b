//! # Request Helpers
//!
//! JSON-over-HTTP helpers that hand back deferreds, so a screen's readiness
//! hook can be "wait for this data to load". Cancelling the deferred aborts
//! the request task.
//!
//! Error mapping:
//! - non-200 response → `NavError::Request { status: Some(code) }`
//! - transport failure → `NavError::Request { status: None }`
//! - 200 with a body that is not JSON → `NavError::Request { status: Some(200) }`
//!
//! Like the timers, requests run as local tasks and need a `LocalSet`.

use std::future::Future;

use futures::future::abortable;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::core::deferred::Deferred;
use crate::core::error::NavError;

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn get_json(&self, url: &str) -> Deferred<Value> {
        let request = self
            .client
            .get(url)
            .header("Content-Type", "application/json")
            .send();
        spawn_request(url, async move { parse_json(check_status(request.await?)?).await })
    }

    pub fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Deferred<Value> {
        let request = self.client.post(url).json(body).send();
        spawn_request(url, async move { parse_json(check_status(request.await?)?).await })
    }

    pub fn get_raw(&self, url: &str) -> Deferred<String> {
        let request = self.client.get(url).send();
        spawn_request(url, async move {
            let response = check_status(request.await?)?;
            Ok::<_, RequestFailure>(response.text().await?)
        })
    }
}

/// Failures inside the request task, before they become a `NavError`.
enum RequestFailure {
    Transport(reqwest::Error),
    Status(StatusCode),
    BadJson(String),
}

impl From<reqwest::Error> for RequestFailure {
    fn from(e: reqwest::Error) -> Self {
        RequestFailure::Transport(e)
    }
}

impl From<RequestFailure> for NavError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::Transport(e) => NavError::Request {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            RequestFailure::Status(status) => NavError::Request {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            },
            RequestFailure::BadJson(message) => NavError::Request {
                status: Some(200),
                message,
            },
        }
    }
}

fn check_status(response: Response) -> Result<Response, RequestFailure> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(RequestFailure::Status(response.status()))
    }
}

async fn parse_json(response: Response) -> Result<Value, RequestFailure> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        warn!("Bad response: {}", body);
        RequestFailure::BadJson(e.to_string())
    })
}

fn spawn_request<T, F>(url: &str, request: F) -> Deferred<T>
where
    T: Clone + 'static,
    F: Future<Output = Result<T, RequestFailure>> + 'static,
{
    let deferred = Deferred::new();
    let (request, handle) = abortable(request);

    let resolver = deferred.clone();
    let target = url.to_string();
    tokio::task::spawn_local(async move {
        match request.await {
            Ok(Ok(value)) => {
                debug!("Request to {} completed", target);
                resolver.resolve(value);
            }
            Ok(Err(failure)) => {
                let err = NavError::from(failure);
                debug!("Request to {} failed: {}", target, err);
                resolver.reject(err);
            }
            Err(_aborted) => {}
        }
    });

    let target = url.to_string();
    deferred.on_cancel(move |_| {
        debug!("Aborting request to {}", target);
        handle.abort();
    });
    deferred
}
