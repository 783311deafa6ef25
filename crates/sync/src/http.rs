// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of [`RemoteApi`] using reqwest.
//!
//! - `POST {base_url}/events` with an `Idempotency-Key` header
//! - `POST {base_url}/sessions`, answering `{"session_id": ...}`

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::remote::{
    EventDelivery, RemoteApi, RemoteError, RemoteFuture, RemoteResult, RemoteSession, SessionStart,
};
use crate::settings::RemoteSettings;

/// Header carrying the event's idempotency token.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Remote API client over HTTP.
pub struct HttpRemote {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    /// Create a client from remote settings.
    ///
    /// No request timeout is applied unless `request_timeout_secs` is set.
    pub fn new(settings: &RemoteSettings) -> RemoteResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::ConnectionFailed(e.to_string()))?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        tracing::info!("remote configured: base_url={}", base_url);

        Ok(HttpRemote {
            client,
            base_url,
            auth_token: settings.auth_token.clone(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host and port a reachability probe should connect to.
    pub fn probe_address(&self) -> Option<(String, u16)> {
        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some((host, port))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}/{}", self.base_url, path));
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn map_send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::ConnectionFailed(e.to_string())
    }
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Rejected { status: status.as_u16(), body })
}

impl RemoteApi for HttpRemote {
    fn deliver_event(&self, delivery: EventDelivery) -> RemoteFuture<'_, ()> {
        Box::pin(async move {
            let response = self
                .post("events")
                .header(IDEMPOTENCY_HEADER, &delivery.idempotency_token)
                .json(&delivery)
                .send()
                .await
                .map_err(map_send_error)?;
            check_status(response).await?;
            Ok(())
        })
    }

    fn start_session(&self, start: SessionStart) -> RemoteFuture<'_, RemoteSession> {
        Box::pin(async move {
            let response = self
                .post("sessions")
                .json(&start)
                .send()
                .await
                .map_err(map_send_error)?;
            let response = check_status(response).await?;
            response
                .json::<RemoteSession>()
                .await
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
        })
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
