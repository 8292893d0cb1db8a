//! REST gateway to the project backend.
//!
//! Every authenticated call first resolves a usable token locally (see
//! `auth`); without one no network I/O happens. Each call builds a fresh
//! short-lived HTTP client with a bounded timeout and is attempted exactly
//! once: no retry, no backoff. A 401 from any authenticated endpoint clears
//! the stored token.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use shared::models::{
    GeneralPrompt, GeneralPromptUpdate, NewRepositoryEntry, Permission, Project, ProjectPayload,
    RepositoryEntry, ResetOutcome, TokenResponse, User, UserPayload, UserPromptEntry, UserType,
};
use std::time::Duration;

use crate::auth::{self, CredentialStore};

/// Per-request timeout. The backend is a plain CRUD API; anything slower
/// than this indicates a stuck connection.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not logged in - run `relato login` to authenticate")]
    AuthenticationRequired,

    #[error("incorrect email or password")]
    BadCredentials,

    #[error("server rejected the request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("connection error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("login response did not contain a token")]
    MissingToken,

    #[error("could not persist credentials: {0}")]
    Storage(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

pub struct ApiClient {
    base_url: String,
    store: CredentialStore,
}

impl ApiClient {
    pub fn new(base_url: String, store: CredentialStore) -> Self {
        // Route paths below all start with '/'.
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { base_url, store }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn http(&self) -> ApiResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?)
    }

    /// Build an authenticated request, or fail locally when no usable token
    /// is stored.
    fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let token = auth::usable_token(&self.store).ok_or(ApiError::AuthenticationRequired)?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.http()?.request(method, url).bearer_auth(token))
    }

    /// Single-attempt dispatch with uniform status handling.
    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            // The backend's verdict overrides the local expiry check.
            if let Err(e) = self.store.clear() {
                tracing::warn!("failed to clear rejected token: {e}");
            }
            return Err(ApiError::AuthenticationRequired);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::RemoteRejected {
            status: status.as_u16(),
            message,
        })
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Exchange credentials for a bearer token and store it. A 401 here
    /// means bad credentials, distinct from every other HTTP failure.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        let response = self
            .http()?
            .post(format!("{}/token", self.base_url))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::BadCredentials);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::RemoteRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = body.access_token.ok_or(ApiError::MissingToken)?;
        self.store.set(&token).map_err(ApiError::Storage)?;
        tracing::info!("login succeeded, token stored");
        Ok(())
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        let req = self.authed(Method::GET, "/usuarios/me")?;
        Ok(self.send(req).await?.json().await?)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn users(&self, filter: Option<&str>) -> ApiResult<Vec<User>> {
        let mut req = self.authed(Method::GET, "/usuarios/")?;
        if let Some(filter) = filter {
            req = req.query(&[("filtro", filter)]);
        }
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn user(&self, id: u32) -> ApiResult<User> {
        let req = self.authed(Method::GET, &format!("/usuarios/{id}"))?;
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn create_user(&self, payload: &UserPayload) -> ApiResult<()> {
        let req = self.authed(Method::POST, "/usuarios/")?.json(payload);
        self.send(req).await?;
        Ok(())
    }

    pub async fn update_user(&self, id: u32, payload: &UserPayload) -> ApiResult<()> {
        let req = self
            .authed(Method::PUT, &format!("/usuarios/{id}"))?
            .json(payload);
        self.send(req).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: u32) -> ApiResult<()> {
        let req = self.authed(Method::DELETE, &format!("/usuarios/{id}"))?;
        self.send(req).await?;
        Ok(())
    }

    /// Server generates a new credential and returns it.
    pub async fn reset_password(&self, id: u32) -> ApiResult<ResetOutcome> {
        let req = self.authed(Method::PUT, &format!("/usuarios/reset/{id}"))?;
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn change_password(&self, id: u32, payload: &UserPayload) -> ApiResult<()> {
        let req = self
            .authed(Method::PUT, &format!("/usuarios/change_password/{id}"))?
            .json(payload);
        self.send(req).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    pub async fn user_types(&self) -> ApiResult<Vec<UserType>> {
        let req = self.authed(Method::GET, "/tipo/")?;
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn permissions(&self) -> ApiResult<Vec<Permission>> {
        let req = self.authed(Method::GET, "/permissao/")?;
        Ok(self.send(req).await?.json().await?)
    }

    // ------------------------------------------------------------------
    // General prompt
    // ------------------------------------------------------------------

    pub async fn general_prompt(&self, id: u32) -> ApiResult<GeneralPrompt> {
        let req = self.authed(Method::GET, &format!("/promptgeral/{id}"))?;
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn update_general_prompt(
        &self,
        id: u32,
        payload: &GeneralPromptUpdate,
    ) -> ApiResult<()> {
        let req = self
            .authed(Method::PUT, &format!("/promptgeral/{id}"))?
            .json(payload);
        self.send(req).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn projects(&self, filter: Option<&str>) -> ApiResult<Vec<Project>> {
        let mut req = self.authed(Method::GET, "/projetos/")?;
        if let Some(filter) = filter {
            req = req.query(&[("filtro", filter)]);
        }
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn project(&self, id: u32) -> ApiResult<Project> {
        let req = self.authed(Method::GET, &format!("/projetos/{id}"))?;
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn create_project(&self, payload: &ProjectPayload) -> ApiResult<()> {
        let req = self.authed(Method::POST, "/projetos/")?.json(payload);
        self.send(req).await?;
        Ok(())
    }

    pub async fn update_project(&self, id: u32, payload: &ProjectPayload) -> ApiResult<()> {
        let req = self
            .authed(Method::PUT, &format!("/projetos/{id}"))?
            .json(payload);
        self.send(req).await?;
        Ok(())
    }

    pub async fn delete_project(&self, id: u32) -> ApiResult<()> {
        let req = self.authed(Method::DELETE, &format!("/projetos/{id}"))?;
        self.send(req).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Repository
    // ------------------------------------------------------------------

    /// Entries for one project; `project_id` 0 is the backend's "all/none"
    /// sentinel.
    pub async fn repository(&self, project_id: u32) -> ApiResult<Vec<RepositoryEntry>> {
        let req = self
            .authed(Method::GET, "/repositorio/")?
            .query(&[("filtro", project_id)]);
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn attach_repository(&self, payload: &NewRepositoryEntry) -> ApiResult<()> {
        let req = self.authed(Method::POST, "/repositorio/")?.json(payload);
        self.send(req).await?;
        Ok(())
    }

    pub async fn delete_repository(&self, id: u32) -> ApiResult<()> {
        let req = self.authed(Method::DELETE, &format!("/repositorio/{id}"))?;
        self.send(req).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // User-prompt history
    // ------------------------------------------------------------------

    pub async fn user_prompts(&self, limit: u32) -> ApiResult<Vec<UserPromptEntry>> {
        let req = self
            .authed(Method::GET, "/promptusuario/")?
            .query(&[("limit", limit)]);
        Ok(self.send(req).await?.json().await?)
    }

    pub async fn record_user_prompt(&self, entry: &UserPromptEntry) -> ApiResult<()> {
        let req = self.authed(Method::POST, "/promptusuario/")?.json(entry);
        self.send(req).await?;
        Ok(())
    }
}
