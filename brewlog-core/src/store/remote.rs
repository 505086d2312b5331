//! Client for the remote brew document store.
//!
//! The store keeps one document per brew, keyed by `id`, in a named table:
//!
//! | Operation | Request |
//! |---|---|
//! | scan   | `GET    {endpoint}/tables/{table}/items` |
//! | get    | `GET    {endpoint}/tables/{table}/items/{id}` |
//! | put    | `PUT    {endpoint}/tables/{table}/items/{id}` |
//! | update | `PATCH  {endpoint}/tables/{table}/items/{id}` |
//! | delete | `DELETE {endpoint}/tables/{table}/items/{id}` |
//!
//! Any failure, including missing configuration, is reported as
//! [`StoreError::BackendUnavailable`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::BrewStore;
use crate::error::StoreError;
use crate::models::{BrewEntry, BrewFields, BrewMethod};

/// Header carrying the configured region.
pub const REGION_HEADER: &str = "x-brewlog-region";

/// Remote document store configuration.
///
/// Everything is optional. Without an endpoint and both credential halves
/// the store is unconfigured and every call is `BackendUnavailable`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the document store (e.g., "https://brews.example.com")
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    pub table_name: String,
    /// Per-request transport timeout
    pub timeout_secs: u64,
    /// Refuse to start when the remote section is incomplete
    pub required: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            table_name: "coffee-brews".to_string(),
            timeout_secs: 10,
            required: false,
        }
    }
}

impl RemoteConfig {
    /// Returns true if endpoint and both credential halves are present.
    pub fn is_configured(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the settings that keep the store unconfigured.
    pub fn missing(&self) -> Vec<&'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if !present(&self.endpoint) {
            missing.push("endpoint");
        }
        if !present(&self.access_key_id) {
            missing.push("access_key_id");
        }
        if !present(&self.secret_access_key) {
            missing.push("secret_access_key");
        }
        missing
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("table_name", &self.table_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("required", &self.required)
            .finish()
    }
}

/// A ready-to-use HTTP connection to the document store.
#[derive(Clone)]
struct Connection {
    http: reqwest::Client,
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
}

/// Body of a scan response.
#[derive(Deserialize)]
struct ScanResponse {
    items: Vec<BrewEntry>,
}

/// Error body the store sends with its responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// `error` code of a 404 for an absent item.
const ITEM_NOT_FOUND: &str = "not_found";

/// Body of an attribute-level update. `created_at` is never sent.
#[derive(Serialize)]
struct UpdateRequest<'a> {
    attributes: UpdateAttributes<'a>,
}

#[derive(Serialize)]
struct UpdateAttributes<'a> {
    coffee_type: &'a str,
    brew_method: BrewMethod,
    grind_size: &'a str,
    water_temp: i32,
    brew_time: i32,
    ratio: &'a str,
    notes: Option<&'a str>,
    rating: i32,
    updated_at: DateTime<Utc>,
}

impl<'a> UpdateRequest<'a> {
    fn new(fields: &'a BrewFields, updated_at: DateTime<Utc>) -> Self {
        Self {
            attributes: UpdateAttributes {
                coffee_type: &fields.coffee_type,
                brew_method: fields.brew_method,
                grind_size: &fields.grind_size,
                water_temp: fields.water_temp,
                brew_time: fields.brew_time,
                ratio: &fields.ratio,
                notes: fields.notes.as_deref(),
                rating: fields.rating,
                updated_at,
            },
        }
    }
}

/// Asynchronous CRUD against the remote document store.
#[derive(Clone)]
pub struct RemoteStore {
    region: String,
    table_name: String,
    /// The connection, or why there is none.
    connection: Result<Connection, String>,
}

impl RemoteStore {
    /// Creates a store from configuration.
    ///
    /// Never fails: an incomplete configuration yields a store that answers
    /// every call with `BackendUnavailable`.
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            region: config.region.clone(),
            table_name: config.table_name.clone(),
            connection: Self::connect(config),
        }
    }

    fn connect(config: &RemoteConfig) -> Result<Connection, String> {
        let missing = config.missing();
        if !missing.is_empty() {
            return Err(format!("not configured (missing {})", missing.join(", ")));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;

        Ok(Connection {
            http,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            access_key_id: config.access_key_id.clone().unwrap_or_default(),
            secret_access_key: config.secret_access_key.clone().unwrap_or_default(),
        })
    }

    /// Returns true if the store has a connection to try.
    pub fn is_configured(&self) -> bool {
        self.connection.is_ok()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn connection(&self) -> Result<&Connection, StoreError> {
        self.connection
            .as_ref()
            .map_err(|reason| StoreError::BackendUnavailable(reason.clone()))
    }

    fn items_url(&self, conn: &Connection) -> String {
        format!(
            "{}/tables/{}/items",
            conn.endpoint,
            urlencoding::encode(&self.table_name)
        )
    }

    fn item_url(&self, conn: &Connection, id: &str) -> String {
        format!("{}/{}", self.items_url(conn), urlencoding::encode(id))
    }

    fn request(&self, conn: &Connection, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        conn.http
            .request(method, url)
            .basic_auth(&conn.access_key_id, Some(&conn.secret_access_key))
            .header(REGION_HEADER, &self.region)
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .send()
            .await
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))
    }

    fn expect_success(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(StoreError::BackendUnavailable(format!(
                "{} returned {}",
                response.url(),
                status
            )))
        }
    }

    /// Accepts a 404 only when the store says the item is absent. Any other
    /// 404 comes from a wrong endpoint or something in front of the store.
    async fn expect_item_missing(response: Response) -> Result<(), StoreError> {
        let url = response.url().to_string();
        match response.json::<ErrorBody>().await {
            Ok(body) if body.error == ITEM_NOT_FOUND => Ok(()),
            _ => Err(StoreError::BackendUnavailable(format!(
                "{} returned {}",
                url,
                StatusCode::NOT_FOUND
            ))),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::BackendUnavailable(format!("invalid response: {}", e)))
    }

    /// Assigns an id and timestamps and writes the full document.
    pub async fn create_brew(&self, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let conn = self.connection()?;
        let entry = BrewEntry::new(Uuid::new_v4().to_string(), fields, Utc::now());

        let url = self.item_url(conn, &entry.id);
        let response = Self::send(self.request(conn, Method::PUT, &url).json(&entry)).await?;
        Self::expect_success(response)?;

        Ok(entry)
    }

    /// Full scan of the table.
    pub async fn get_all_brews(&self) -> Result<Vec<BrewEntry>, StoreError> {
        let conn = self.connection()?;

        let url = self.items_url(conn);
        let response = Self::send(self.request(conn, Method::GET, &url)).await?;
        let scan: ScanResponse = Self::decode(Self::expect_success(response)?).await?;

        Ok(scan.items)
    }

    pub async fn get_brew_by_id(&self, id: &str) -> Result<Option<BrewEntry>, StoreError> {
        let conn = self.connection()?;

        let url = self.item_url(conn, id);
        let response = Self::send(self.request(conn, Method::GET, &url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Self::expect_item_missing(response).await.map(|()| None);
        }

        Self::decode(Self::expect_success(response)?).await.map(Some)
    }

    /// Updates only the editable attributes and `updated_at`.
    pub async fn update_brew(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let conn = self.connection()?;

        let url = self.item_url(conn, id);
        let body = UpdateRequest::new(&fields, Utc::now());
        let response = Self::send(self.request(conn, Method::PATCH, &url).json(&body)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            Self::expect_item_missing(response).await?;
            return Err(StoreError::NotFound(id.to_string()));
        }

        Self::decode(Self::expect_success(response)?).await
    }

    /// Deletes by id. The store answers success for a missing document too,
    /// so a 404 here means the store itself was not reached.
    pub async fn delete_brew(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connection()?;

        let url = self.item_url(conn, id);
        let response = Self::send(self.request(conn, Method::DELETE, &url)).await?;
        Self::expect_success(response).map(|_| ())
    }

    /// Hits the store's health endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;

        let url = format!("{}/health", conn.endpoint);
        let response = Self::send(self.request(conn, Method::GET, &url)).await?;
        Self::expect_success(response).map(|_| ())
    }
}

#[async_trait]
impl BrewStore for RemoteStore {
    fn is_configured(&self) -> bool {
        RemoteStore::is_configured(self)
    }

    async fn create(&self, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        self.create_brew(fields).await
    }

    async fn list(&self) -> Result<Vec<BrewEntry>, StoreError> {
        self.get_all_brews().await
    }

    async fn get(&self, id: &str) -> Result<Option<BrewEntry>, StoreError> {
        self.get_brew_by_id(id).await
    }

    async fn update(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        self.update_brew(id, fields).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_brew(id).await
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> RemoteConfig {
        RemoteConfig {
            endpoint: Some("http://127.0.0.1:9/".to_string()),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            timeout_secs: 2,
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = RemoteConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.table_name, "coffee-brews");
        assert!(!config.required);
        assert!(!config.is_configured());
        assert_eq!(
            config.missing(),
            vec!["endpoint", "access_key_id", "secret_access_key"]
        );
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let config = RemoteConfig {
            secret_access_key: Some("  ".to_string()),
            ..configured()
        };
        assert_eq!(config.missing(), vec!["secret_access_key"]);
    }

    #[test]
    fn test_config_from_yaml_like_json() {
        let config: RemoteConfig =
            serde_json::from_str(r#"{"endpoint": "https://brews.test", "region": "eu-west-1"}"#)
                .unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.table_name, "coffee-brews");
        assert_eq!(config.missing(), vec!["access_key_id", "secret_access_key"]);
    }

    #[test]
    fn test_secret_is_not_serialized_or_printed() {
        let config = configured();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!format!("{:?}", config).contains("\"secret\""));
    }

    #[test]
    fn test_urls_trim_endpoint_and_encode() {
        let store = RemoteStore::new(&RemoteConfig {
            table_name: "my brews".to_string(),
            ..configured()
        });
        let conn = store.connection().unwrap();
        assert_eq!(
            store.items_url(conn),
            "http://127.0.0.1:9/tables/my%20brews/items"
        );
        assert_eq!(
            store.item_url(conn, "a/b"),
            "http://127.0.0.1:9/tables/my%20brews/items/a%2Fb"
        );
    }

    #[test]
    fn test_update_body_omits_created_at() {
        let fields = BrewFields::new("Kenya AA", BrewMethod::V60, "Fine");
        let body = serde_json::to_value(UpdateRequest::new(&fields, Utc::now())).unwrap();
        let attributes = body["attributes"].as_object().unwrap();

        assert!(attributes.contains_key("updated_at"));
        assert!(attributes.contains_key("notes"));
        assert!(!attributes.contains_key("created_at"));
        assert!(!attributes.contains_key("id"));
    }

    #[tokio::test]
    async fn test_unconfigured_store_is_unavailable_for_every_call() {
        let store = RemoteStore::new(&RemoteConfig::default());
        assert!(!store.is_configured());

        let fields = BrewFields::new("Kenya AA", BrewMethod::V60, "Fine");
        let results = [
            store.create_brew(fields.clone()).await.map(|_| ()),
            store.get_all_brews().await.map(|_| ()),
            store.get_brew_by_id("1").await.map(|_| ()),
            store.update_brew("1", fields).await.map(|_| ()),
            store.delete_brew("1").await,
            store.ping().await,
        ];

        for result in results {
            let err = result.unwrap_err();
            assert!(err.is_backend_unavailable());
            assert!(err.to_string().contains("not configured"));
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let store = RemoteStore::new(&configured());
        assert!(store.is_configured());

        let err = store.get_all_brews().await.unwrap_err();
        assert!(err.is_backend_unavailable());

        let err = store.delete_brew("1").await.unwrap_err();
        assert!(err.is_backend_unavailable());
    }
}
