//! HTTP record store client.
//!
//! Talks to a PocketBase-style REST API using [`reqwest`]:
//!
//! | operation | request                                        |
//! |-----------|------------------------------------------------|
//! | create    | `POST   /api/collections/{c}/records`          |
//! | update    | `PATCH  /api/collections/{c}/records/{id}`     |
//! | delete    | `DELETE /api/collections/{c}/records/{id}`     |
//! | list      | `GET    /api/collections/{c}/records?filter=…` |

use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, trace};

use crate::error::{StoreError, StoreResult};
use crate::store::{Filter, RecordStore, StoreFuture};

/// Default backend URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Records fetched per page when listing.
const PAGE_SIZE: u32 = 500;

/// Collection holding user accounts.
const USERS: &str = "users";

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Auth token sent with every request.
    pub token: Option<String>,
    /// Id of the user the token belongs to.
    pub user_id: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A token and the user it authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Auth token.
    pub token: String,
    /// Authenticated user id.
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    record: AuthRecord,
}

#[derive(Debug, Deserialize)]
struct AuthRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    page: u32,
    total_pages: u32,
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    token: Option<String>,
    user_id: Option<String>,
}

/// [`RecordStore`] backed by the backend's REST API.
#[derive(Debug)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    credentials: RwLock<Credentials>,
}

impl HttpStore {
    /// Creates a client from the given settings.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Request` if the HTTP client cannot be built.
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a store reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: HttpStoreConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: RwLock::new(Credentials {
                token: config.token,
                user_id: config.user_id,
            }),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signs in with a password and keeps the returned token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` if the credentials are rejected.
    pub async fn authenticate(&self, identity: &str, password: &str) -> StoreResult<AuthSession> {
        let url = format!(
            "{}/api/collections/{USERS}/auth-with-password",
            self.base_url
        );
        debug!(identity, "authenticating");

        let response = self
            .client
            .post(url)
            .json(&json!({ "identity": identity, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::parse(response).await?;

        {
            let mut credentials = self.credentials.write();
            credentials.token = Some(auth.token.clone());
            credentials.user_id = Some(auth.record.id.clone());
        }
        info!(user_id = %auth.record.id, "authenticated");

        Ok(AuthSession {
            token: auth.token,
            user_id: auth.record.id,
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.base_url)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{id}", self.records_url(collection))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.read().token.clone() {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        }
    }

    /// Maps a non-2xx response to [`StoreError::Api`].
    async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turns a 404 on a specific record into `StoreError::NotFound`.
fn record_error(err: StoreError, collection: &str, id: &str) -> StoreError {
    match err {
        StoreError::Api { status: 404, .. } => StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        other => other,
    }
}

impl RecordStore for HttpStore {
    fn create<'a>(&'a self, collection: &'a str, fields: Value) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            trace!(collection, "create record");
            let request = self.client.post(self.records_url(collection)).json(&fields);
            let response = self.authorize(request).send().await?;
            Self::parse(response).await
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            trace!(collection, id, "update record");
            let request = self
                .client
                .patch(self.record_url(collection, id))
                .json(&fields);
            let response = self.authorize(request).send().await?;
            Self::parse(response)
                .await
                .map_err(|e| record_error(e, collection, id))
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            trace!(collection, id, "delete record");
            let request = self.client.delete(self.record_url(collection, id));
            let response = self.authorize(request).send().await?;
            Self::ensure_success(response)
                .await
                .map(|_| ())
                .map_err(|e| record_error(e, collection, id))
        })
    }

    fn list<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let expression = filter.to_expression();
            let mut items = Vec::new();
            let mut page = 1_u32;

            loop {
                let mut query = vec![
                    ("page", page.to_string()),
                    ("perPage", PAGE_SIZE.to_string()),
                ];
                if !expression.is_empty() {
                    query.push(("filter", expression.clone()));
                }

                let request = self.client.get(self.records_url(collection)).query(&query);
                let response = self.authorize(request).send().await?;
                let batch: ListPage = Self::parse(response).await?;

                trace!(collection, page = batch.page, count = batch.items.len(), "listed page");
                items.extend(batch.items);

                if batch.page >= batch.total_pages {
                    break;
                }
                page += 1;
            }

            debug!(collection, count = items.len(), "listed records");
            Ok(items)
        })
    }

    fn user_id(&self) -> Option<String> {
        self.credentials.read().user_id.clone()
    }
}
