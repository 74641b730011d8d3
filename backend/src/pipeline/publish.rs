//! Uploads rendered reports to Dropbox and returns a public shared link.
//!
//! The report goes to `/<file name>` in overwrite mode, so a second run for
//! the same student replaces the earlier upload. When Dropbox answers that a
//! shared link already exists for the path, that link is reused.

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::pipeline::{PublishedLink, RenderedArtifact};
use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn publish(&self, artifact: &RenderedArtifact) -> Result<PublishedLink>;
}

pub struct DropboxPublisher {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
    content_base: String,
}

impl DropboxPublisher {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            access_token: config.dropbox_access_token.clone(),
            api_base: config.dropbox_api_base.trim_end_matches('/').to_string(),
            content_base: config.dropbox_content_base.trim_end_matches('/').to_string(),
        }
    }

    async fn upload(&self, remote_path: &str, bytes: Vec<u8>) -> Result<()> {
        let arg = header_safe_json(
            &json!({ "path": remote_path, "mode": "overwrite", "autorename": false, "mute": true })
                .to_string(),
        );
        let response = self
            .client
            .post(format!("{}/2/files/upload", self.content_base))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::Publish(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Publish(format!("upload {}: {}", status, body)));
        }
        Ok(())
    }

    async fn shared_link(&self, remote_path: &str) -> Result<String> {
        let (status, body) = self
            .rpc("sharing/create_shared_link_with_settings", json!({ "path": remote_path }))
            .await?;
        if status.is_success() {
            return body
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| PipelineError::Publish("shared link response has no url".to_string()));
        }
        if status == StatusCode::CONFLICT && is_link_already_exists(&body) {
            if let Some(url) = existing_link_url(&body) {
                return Ok(url);
            }
            debug!("Shared link for {} exists; listing it", remote_path);
            return self.list_existing_link(remote_path).await;
        }
        Err(PipelineError::Publish(format!("shared link {}: {}", status, body)))
    }

    async fn list_existing_link(&self, remote_path: &str) -> Result<String> {
        let (status, body) = self
            .rpc(
                "sharing/list_shared_links",
                json!({ "path": remote_path, "direct_only": true }),
            )
            .await?;
        if !status.is_success() {
            return Err(PipelineError::Publish(format!("list shared links {}: {}", status, body)));
        }
        body.pointer("/links/0/url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Publish(format!("no shared link listed for {}", remote_path)))
    }

    async fn rpc(&self, endpoint: &str, payload: Value) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .post(format!("{}/2/{}", self.api_base, endpoint))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::Publish(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Publish(e.to_string()))?;
        // Dropbox sometimes answers errors in plain text.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }
}

#[async_trait]
impl ArtifactPublisher for DropboxPublisher {
    async fn publish(&self, artifact: &RenderedArtifact) -> Result<PublishedLink> {
        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| PipelineError::Publish(format!("cannot read {}: {}", artifact.path.display(), e)))?;
        let remote_path = format!("/{}", artifact.file_name);
        self.upload(&remote_path, bytes).await?;
        let url = self.shared_link(&remote_path).await?;
        Ok(PublishedLink { url })
    }
}

fn is_link_already_exists(body: &Value) -> bool {
    body.get("error_summary")
        .and_then(Value::as_str)
        .is_some_and(|s| s.starts_with("shared_link_already_exists"))
}

fn existing_link_url(body: &Value) -> Option<String> {
    body.pointer("/error/shared_link_already_exists/metadata/url")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Escapes non-ASCII characters as `\uXXXX` so JSON can travel in an HTTP
/// header, as Dropbox requires for `Dropbox-API-Arg`.
fn header_safe_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
