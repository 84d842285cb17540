//! HTTP client for the key-value endpoints.

use anyhow::{bail, Context};
use kvstore_core::messages::CONTENT_TYPE;
use kvstore_core::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Speaks the server's `MsgPack` protocol over HTTP.
///
/// A fault inside the store is returned as a normal response with `error`
/// set; only transport failures, refusals and undecodable replies are
/// `Err`.
#[derive(Debug, Clone)]
pub struct KvClient {
    http: reqwest::Client,
    base_url: String,
}

impl KvClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:50051`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a refused request.
    pub async fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<PutResponse> {
        let request = PutRequest {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        self.call("/kv/put", &request).await
    }

    /// Looks up `key`.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a refused request.
    pub async fn get(&self, key: &[u8]) -> anyhow::Result<GetResponse> {
        self.call("/kv/get", &GetRequest { key: key.to_vec() }).await
    }

    /// Removes `key`; `success` tells whether it existed.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a refused request.
    pub async fn delete(&self, key: &[u8]) -> anyhow::Result<DeleteResponse> {
        self.call("/kv/delete", &DeleteRequest { key: key.to_vec() })
            .await
    }

    /// Fetches the `/health` document.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-JSON reply.
    pub async fn health(&self) -> anyhow::Result<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("health request failed")?;
        Ok(response.json().await?)
    }

    async fn call<Req, Resp>(&self, path: &str, request: &Req) -> anyhow::Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = rmp_serde::to_vec_named(request)?;
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::INTERNAL_SERVER_ERROR {
            let text = response.text().await.unwrap_or_default();
            bail!("{path} returned {status}: {text}");
        }
        let bytes = response.bytes().await?;
        rmp_serde::from_slice(&bytes)
            .with_context(|| format!("undecodable {status} response from {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = KvClient::new("http://127.0.0.1:50051/");
        assert_eq!(client.base_url, "http://127.0.0.1:50051");
    }
}
