use crate::config::Config;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Maps a student name to a messaging address.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Exact-match lookup. `Ok(None)` when nobody matches; the first row wins
    /// when several do.
    async fn resolve(&self, student_name: &str) -> Result<Option<String>>;
}

/// Looks contacts up in a Supabase table through its PostgREST endpoint.
pub struct SupabaseDirectory {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    name_column: String,
    contact_field: String,
}

impl SupabaseDirectory {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
            table: config.contacts_table.clone(),
            name_column: config.contact_name_column.clone(),
            contact_field: config.contact_field.clone(),
        }
    }
}

#[async_trait]
impl ContactDirectory for SupabaseDirectory {
    async fn resolve(&self, student_name: &str) -> Result<Option<String>> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let filter = format!("eq.{}", student_name);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("select", self.contact_field.as_str()),
                (self.name_column.as_str(), filter.as_str()),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PipelineError::Resolve(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Resolve(format!("{}: {}", status, body)));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| PipelineError::Resolve(e.to_string()))?;
        Ok(first_contact(&rows, &self.contact_field))
    }
}

/// Contact field of the first row; numbers are accepted as well as text.
fn first_contact(rows: &[Value], field: &str) -> Option<String> {
    match rows.first()?.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
