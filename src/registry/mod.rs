//! Thing directory access - registration and reconciliation

mod bridge;
mod registration;

pub use bridge::{DirectoryBridge, ReconcileReport};
pub use registration::{RegistrationClient, RegistrationState};

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// A thing as listed by the directory
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub registration: Option<RegistrationInfo>,
    #[serde(default)]
    pub forms: Vec<EntryForm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationInfo {
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryForm {
    pub href: String,
    #[serde(default)]
    pub op: Value,
}

impl DirectoryEntry {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.registration.as_ref().and_then(|r| r.created)
    }

    /// Base URL of the thing, derived from its read-all-properties form
    pub fn td_url(&self) -> Option<String> {
        self.forms
            .iter()
            .find(|f| match &f.op {
                Value::String(op) => op == "readallproperties",
                Value::Array(ops) => ops.iter().any(|op| op == "readallproperties"),
                _ => false,
            })
            .or_else(|| self.forms.first())
            .map(|f| f.href.replace("properties", ""))
    }
}

/// Operations on a thing description directory
#[async_trait]
pub trait Directory: Send + Sync {
    /// Store a description under `id`, returning the HTTP status
    async fn put_thing(&self, id: &str, description: &Value) -> Result<u16>;

    async fn get_thing(&self, id: &str) -> Result<Value>;

    async fn list_things(&self) -> Result<Vec<DirectoryEntry>>;

    async fn delete_thing(&self, id: &str) -> Result<()>;
}

/// Directory reached over HTTP, e.g. `http://localhost:9000/api/things/`
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build directory client")?;

        Ok(Self {
            base_url: normalize(base_url),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn thing_url(&self, id: &str) -> String {
        format!("{}{}", self.base_url, id)
    }

    /// Listing lives at `{root}/things`, next to the `{root}/api/things/`
    /// management endpoint. Any other base is listed as is.
    pub fn list_url(&self) -> String {
        match self.base_url.strip_suffix("api/things/") {
            Some(root) => format!("{}things", root),
            None => self.base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn normalize(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn put_thing(&self, id: &str, description: &Value) -> Result<u16> {
        let response = self
            .client
            .put(self.thing_url(id))
            .json(description)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    async fn get_thing(&self, id: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.thing_url(id))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn list_things(&self) -> Result<Vec<DirectoryEntry>> {
        let response = self
            .client
            .get(self.list_url())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn delete_thing(&self, id: &str) -> Result<()> {
        self.client
            .delete(self.thing_url(id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// In-memory directory with scripted PUT statuses
    #[derive(Default)]
    pub struct FakeDirectory {
        pub statuses: Mutex<Vec<u16>>,
        pub puts: Mutex<Vec<String>>,
        pub things: Mutex<BTreeMap<String, Value>>,
        pub deleted: Mutex<Vec<String>>,
    }

    impl FakeDirectory {
        pub fn with_statuses(statuses: &[u16]) -> Self {
            Self {
                statuses: Mutex::new(statuses.to_vec()),
                ..Self::default()
            }
        }

        pub fn insert(&self, entry: Value) {
            let id = entry["id"].as_str().unwrap_or_default().to_string();
            self.things.lock().insert(id, entry);
        }
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn put_thing(&self, id: &str, description: &Value) -> Result<u16> {
            self.puts.lock().push(id.to_string());
            let mut statuses = self.statuses.lock();
            let status = if statuses.is_empty() { 201 } else { statuses.remove(0) };
            if status == 0 {
                anyhow::bail!("connection refused");
            }
            if status < 300 {
                self.things.lock().insert(id.to_string(), description.clone());
            }
            Ok(status)
        }

        async fn get_thing(&self, id: &str) -> Result<Value> {
            self.things
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("thing {} not found", id))
        }

        async fn list_things(&self) -> Result<Vec<DirectoryEntry>> {
            let things = self.things.lock();
            things
                .values()
                .map(|v| serde_json::from_value(v.clone()).map_err(anyhow::Error::from))
                .collect()
        }

        async fn delete_thing(&self, id: &str) -> Result<()> {
            self.things.lock().remove(id);
            self.deleted.lock().push(id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_url() {
        let dir = HttpDirectory::new("http://localhost:9000/api/things", Duration::from_secs(1)).unwrap();
        assert_eq!(dir.base_url(), "http://localhost:9000/api/things/");
        assert_eq!(dir.thing_url("urn:uuid:1"), "http://localhost:9000/api/things/urn:uuid:1");

        let dir = HttpDirectory::new("http://localhost:9000/api/things//", Duration::from_secs(1)).unwrap();
        assert_eq!(dir.base_url(), "http://localhost:9000/api/things/");
    }

    #[test]
    fn test_list_url_uses_directory_root() {
        let dir = HttpDirectory::new("http://localhost:9000/api/things/", Duration::from_secs(1)).unwrap();
        assert_eq!(dir.list_url(), "http://localhost:9000/things");
        assert_eq!(dir.thing_url("urn:uuid:1"), "http://localhost:9000/api/things/urn:uuid:1");

        let dir = HttpDirectory::new("http://directory/registry", Duration::from_secs(1)).unwrap();
        assert_eq!(dir.list_url(), "http://directory/registry");
    }

    #[test]
    fn test_entry_td_url_and_created() {
        let entry: DirectoryEntry = serde_json::from_value(json!({
            "id": "urn:uuid:1",
            "title": "WoT-ID-Mfr-VIN-1",
            "registration": { "created": "2026-03-01T10:00:00Z" },
            "forms": [
                { "href": "http://host:8080/wot-id-mfr-vin-1/properties", "op": ["readallproperties"] }
            ]
        }))
        .unwrap();

        assert_eq!(entry.td_url().as_deref(), Some("http://host:8080/wot-id-mfr-vin-1/"));
        assert_eq!(entry.created().unwrap().to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_entry_without_registration() {
        let entry: DirectoryEntry = serde_json::from_value(json!({ "id": "urn:uuid:2" })).unwrap();
        assert!(entry.created().is_none());
        assert!(entry.td_url().is_none());
    }
}
