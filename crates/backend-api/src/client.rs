//! HTTP client for the catalog and user profile endpoints.

use crate::error::{CatalogError, CatalogResult};
use crate::models::{BackendUser, Book, Grade};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

fn summarize_response_body(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Where the catalog fetcher gets its two collections from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Retrieve every grade, in server order.
    async fn fetch_grades(&self) -> CatalogResult<Vec<Grade>>;

    /// Retrieve every book, in server order.
    async fn fetch_books(&self) -> CatalogResult<Vec<Book>>;
}

/// REST client for the StartSmart backend.
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Backend origin, e.g. `https://start-smart-backend.vercel.app`
    /// * `timeout` - Applied to every request; expiry surfaces as a network error
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        Url::parse(base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the URL for an `/api/...` endpoint.
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    /// Fail on non-2xx and return the body bytes otherwise.
    async fn read_success(response: Response) -> CatalogResult<Vec<u8>> {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                url = %url,
                body_summary = %summarize_response_body(&body),
                "Backend request failed"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> CatalogResult<T> {
        let url = self.api_url(endpoint);
        debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let body = Self::read_success(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /api/grades`
    pub async fn get_grades(&self) -> CatalogResult<Vec<Grade>> {
        let grades: Vec<Grade> = self.get_json("grades").await?;
        debug!(count = grades.len(), "Fetched grades");
        Ok(grades)
    }

    /// `GET /api/books`
    pub async fn get_books(&self) -> CatalogResult<Vec<Book>> {
        let books: Vec<Book> = self.get_json("books").await?;
        debug!(count = books.len(), "Fetched books");
        Ok(books)
    }

    /// `GET /api/get-user?email=`
    ///
    /// Returns `Ok(None)` when the backend has no profile for that email
    /// (404, `null` or an empty body).
    pub async fn get_user_by_email(&self, email: &str) -> CatalogResult<Option<BackendUser>> {
        let url = self.api_url("get-user");
        debug!(url = %url, "Fetching backend profile");

        let response = self
            .http_client
            .get(&url)
            .query(&[("email", email)])
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = Self::read_success(response).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<BackendUser>>(&body)?)
    }

    /// `POST /api/users` with `{email, name}`.
    pub async fn create_user(&self, email: &str, name: &str) -> CatalogResult<()> {
        let url = self.api_url("users");
        debug!(url = %url, "Creating backend profile");

        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "name": name,
            }))
            .send()
            .await?;

        Self::read_success(response).await?;
        Ok(())
    }

    /// `PUT /api/users` with `{_id, name, phone}`.
    pub async fn update_user(
        &self,
        id: Option<&str>,
        name: &str,
        phone: &str,
    ) -> CatalogResult<()> {
        let url = self.api_url("users");
        debug!(url = %url, "Updating backend profile");

        let response = self
            .http_client
            .put(&url)
            .json(&serde_json::json!({
                "_id": id,
                "name": name,
                "phone": phone,
            }))
            .send()
            .await?;

        Self::read_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn fetch_grades(&self) -> CatalogResult<Vec<Grade>> {
        self.get_grades().await
    }

    async fn fetch_books(&self) -> CatalogResult<Vec<Book>> {
        self.get_books().await
    }
}
