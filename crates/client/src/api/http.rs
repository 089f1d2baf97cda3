//! `reqwest` implementation of the API traits.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use shopfront_core::{Credential, ProductId, Role};

use super::{
    AddItemRequest, AuthApi, CartAck, CartApi, CartResponse, CartSummary, ItemCount,
    LoginCredentials, LoginResponse, UpdateItemRequest, UserPayload,
};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Header carrying a per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for the storefront API.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(serde::Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

impl HttpBackend {
    /// Create a new backend from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        // Relative joins replace the last path segment unless it ends in '/'
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpBackendInner { client, base_url }),
        })
    }

    /// The normalized API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Network(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request and return the raw body of a successful response.
    #[instrument(skip(self, bearer, body), fields(request_id))]
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&Credential>,
        body: Option<&B>,
    ) -> Result<String, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(credential) = bearer {
            request = request.header(AUTHORIZATION, credential.bearer());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(status = status.as_u16(), "Credential rejected");
            return Err(ApiError::Unauthorized {
                message: error_message(&text),
            });
        }

        if !status.is_success() {
            let message = error_message(&text);
            tracing::error!(
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "API returned error status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&Credential>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + Sync + ?Sized,
    {
        let text = self.send(method, path, bearer, body).await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn call_strict<T, B>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&Credential>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let text = self.send(method, path, bearer, body).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Pull the `error` field out of a failure payload.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .filter(|message| !message.trim().is_empty())
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(
        &self,
        role: Role,
        credentials: &LoginCredentials,
    ) -> Result<LoginResponse, ApiError> {
        self.call_strict(Method::POST, &role.login_path(), None, Some(credentials))
            .await
    }

    async fn logout(&self, bearer: Option<&Credential>) -> Result<(), ApiError> {
        self.send::<()>(Method::POST, "/logout", bearer, None)
            .await
            .map(|_| ())
    }

    async fn profile(&self, role: Role, bearer: &Credential) -> Result<UserPayload, ApiError> {
        self.call_strict::<_, ()>(Method::GET, &role.profile_path(), Some(bearer), None)
            .await
    }
}

#[async_trait]
impl CartApi for HttpBackend {
    async fn cart(&self, bearer: Option<&Credential>) -> Result<CartResponse, ApiError> {
        self.call::<_, ()>(Method::GET, "/api/cart", bearer, None)
            .await
    }

    async fn add_item(
        &self,
        bearer: Option<&Credential>,
        item: AddItemRequest,
    ) -> Result<CartAck, ApiError> {
        self.call(Method::POST, "/api/cart/items", bearer, Some(&item))
            .await
    }

    async fn update_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
        update: UpdateItemRequest,
    ) -> Result<CartAck, ApiError> {
        let path = format!("/api/cart/items/{product_id}");
        self.call(Method::PUT, &path, bearer, Some(&update)).await
    }

    async fn remove_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
    ) -> Result<CartAck, ApiError> {
        let path = format!("/api/cart/items/{product_id}");
        self.call::<_, ()>(Method::DELETE, &path, bearer, None).await
    }

    async fn clear(&self, bearer: Option<&Credential>) -> Result<CartAck, ApiError> {
        self.call::<_, ()>(Method::DELETE, "/api/cart", bearer, None)
            .await
    }

    async fn summary(&self, bearer: Option<&Credential>) -> Result<CartSummary, ApiError> {
        self.call::<_, ()>(Method::GET, "/api/cart/summary", bearer, None)
            .await
    }

    async fn item_count(&self, bearer: Option<&Credential>) -> Result<ItemCount, ApiError> {
        self.call::<_, ()>(Method::GET, "/api/cart/count", bearer, None)
            .await
    }
}
