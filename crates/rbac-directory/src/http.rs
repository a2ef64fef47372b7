//! reqwest-backed [`DirectoryClient`] for a Logto-style management API

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::DirectoryClient;
use crate::token::TokenCache;
use crate::types::{
    ApplicationDraft, RemoteApplication, RemoteConnector, RemoteResource, RemoteRole, RemoteScope,
    ResourceDraft, RoleDraft, RoleKind, ScopeDraft,
};
use crate::{DirectoryError, Result};

/// Upper bound on pages fetched for one collection.
const MAX_PAGES: usize = 1000;

/// Connection settings for [`HttpDirectoryClient`].
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Directory base URL without the `/api` suffix.
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total tries for a request that fails with a retryable error.
    pub max_attempts: u32,
    /// Delay before the first retry; later retries back off exponentially.
    pub retry_interval: Duration,
    pub page_size: usize,
}

impl DirectoryConfig {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_interval: Duration::from_millis(500),
            page_size: 100,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// List responses arrive either bare or wrapped in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Items(Vec<T>),
    Wrapped { data: Vec<T> },
}

/// Entities whose id identifies them across pages.
trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for RemoteResource {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for RemoteScope {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for RemoteRole {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for RemoteApplication {
    fn key(&self) -> &str {
        &self.id
    }
}

impl<T> Page<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Page::Items(items) | Page::Wrapped { data: items } => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationSignIn {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsentScopes {
    #[serde(default)]
    user_scopes: Vec<String>,
}

/// Directory client speaking JSON over HTTPS with bearer authentication.
#[derive(Debug)]
pub struct HttpDirectoryClient {
    config: DirectoryConfig,
    http: reqwest::Client,
    tokens: TokenCache,
}

impl HttpDirectoryClient {
    /// Build a client. No network traffic happens until the first call.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(DirectoryError::Config("endpoint is empty".to_string()));
        }
        if config.page_size == 0 {
            return Err(DirectoryError::Config("page size must be positive".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectoryError::Config(e.to_string()))?;
        let tokens = TokenCache::new(
            config.endpoint.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            http.clone(),
        );

        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let token = self.tokens.get_token().await?;
        let url = self.url(path);

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| DirectoryError::Transport { url, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body,
        })
    }

    /// Send a request, retrying server errors, rate limiting, and a first
    /// rejected token.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        debug!(%method, path, "Directory request");

        let max_attempts = self.config.max_attempts.max(1);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_interval)
            .with_max_elapsed_time(None)
            .build();
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let method = &method;

        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match self.send_once(method, path, body).await {
                Ok(response) => Ok(response),
                Err(err)
                    if attempt < max_attempts
                        && (err.is_retryable()
                            || (attempt == 1 && err.status() == Some(StatusCode::UNAUTHORIZED))) =>
                {
                    warn!(%method, path, attempt, error = %err, "Retrying directory request");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        response.json::<T>().await.map_err(|e| DirectoryError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None).await?;
        Self::decode(response, path).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let response = self.execute(method, path, Some(body)).await?;
        Self::decode(response, path).await
    }

    async fn send_empty(&self, method: Method, path: &str, body: Option<&Value>) -> Result<()> {
        self.execute(method, path, body).await.map(|_| ())
    }

    /// Fetch every page of a collection.
    ///
    /// Stops at a short page, or at a page that brings no unseen id. The
    /// latter covers endpoints that ignore the paging parameters and return
    /// the same full page every time.
    async fn list<T: DeserializeOwned + Keyed>(&self, path: &str) -> Result<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let page_size = self.config.page_size;
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let paged = format!("{path}{separator}page={page}&page_size={page_size}");
            let batch = self.get_json::<Page<T>>(&paged).await?.into_items();
            let fetched = batch.len();
            let before = items.len();
            items.extend(
                batch
                    .into_iter()
                    .filter(|item| seen.insert(item.key().to_string())),
            );
            if fetched < page_size || items.len() == before {
                if fetched > 0 && items.len() == before {
                    debug!(path, page, "Page repeated earlier items; stopping");
                }
                break;
            }
        }

        Ok(items)
    }

    fn body<T: serde::Serialize>(value: &T) -> Result<Value> {
        serde_json::to_value(value).map_err(|e| DirectoryError::Config(e.to_string()))
    }
}

fn not_found_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
        Err(err) => Err(err),
    }
}

/// The customizer endpoint has answered with both a single object and a
/// list of objects.
fn extract_script(value: &Value) -> Option<String> {
    let entry = match value {
        Value::Array(entries) => entries.first()?,
        other => other,
    };
    entry.get("script")?.as_str().map(str::to_string)
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn ping(&self) -> Result<()> {
        self.send_empty(Method::GET, "/resources?page=1&page_size=1", None)
            .await
    }

    async fn list_resources(&self) -> Result<Vec<RemoteResource>> {
        self.list("/resources").await
    }

    async fn create_resource(&self, draft: &ResourceDraft) -> Result<RemoteResource> {
        self.send_json(Method::POST, "/resources", &Self::body(draft)?)
            .await
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<()> {
        self.send_empty(Method::DELETE, &format!("/resources/{resource_id}"), None)
            .await
    }

    async fn list_resource_scopes(&self, resource_id: &str) -> Result<Vec<RemoteScope>> {
        self.list(&format!("/resources/{resource_id}/scopes")).await
    }

    async fn create_resource_scope(
        &self,
        resource_id: &str,
        draft: &ScopeDraft,
    ) -> Result<RemoteScope> {
        self.send_json(
            Method::POST,
            &format!("/resources/{resource_id}/scopes"),
            &Self::body(draft)?,
        )
        .await
    }

    async fn delete_resource_scope(&self, resource_id: &str, scope_id: &str) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/resources/{resource_id}/scopes/{scope_id}"),
            None,
        )
        .await
    }

    async fn list_organization_scopes(&self) -> Result<Vec<RemoteScope>> {
        self.list("/organization-scopes").await
    }

    async fn create_organization_scope(&self, draft: &ScopeDraft) -> Result<RemoteScope> {
        self.send_json(Method::POST, "/organization-scopes", &Self::body(draft)?)
            .await
    }

    async fn update_organization_scope(&self, scope_id: &str, draft: &ScopeDraft) -> Result<()> {
        self.send_empty(
            Method::PATCH,
            &format!("/organization-scopes/{scope_id}"),
            Some(&Self::body(draft)?),
        )
        .await
    }

    async fn delete_organization_scope(&self, scope_id: &str) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/organization-scopes/{scope_id}"),
            None,
        )
        .await
    }

    async fn list_roles(&self, kind: RoleKind) -> Result<Vec<RemoteRole>> {
        self.list(&format!("/{}", kind.collection())).await
    }

    async fn create_role(&self, kind: RoleKind, draft: &RoleDraft) -> Result<RemoteRole> {
        self.send_json(
            Method::POST,
            &format!("/{}", kind.collection()),
            &Self::body(draft)?,
        )
        .await
    }

    async fn update_role(&self, kind: RoleKind, role_id: &str, draft: &RoleDraft) -> Result<()> {
        self.send_empty(
            Method::PATCH,
            &format!("/{}/{role_id}", kind.collection()),
            Some(&Self::body(draft)?),
        )
        .await
    }

    async fn delete_role(&self, kind: RoleKind, role_id: &str) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/{}/{role_id}", kind.collection()),
            None,
        )
        .await
    }

    async fn list_role_scopes(&self, kind: RoleKind, role_id: &str) -> Result<Vec<RemoteScope>> {
        self.list(&format!("/{}/{role_id}/scopes", kind.collection()))
            .await
    }

    async fn assign_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()> {
        let body = match kind {
            RoleKind::Organization => json!({ "organizationScopeIds": scope_ids }),
            RoleKind::User => json!({ "scopeIds": scope_ids }),
        };
        self.send_empty(
            Method::POST,
            &format!("/{}/{role_id}/scopes", kind.collection()),
            Some(&body),
        )
        .await
    }

    async fn remove_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()> {
        // The API removes bindings one scope at a time.
        for scope_id in scope_ids {
            self.send_empty(
                Method::DELETE,
                &format!("/{}/{role_id}/scopes/{scope_id}", kind.collection()),
                None,
            )
            .await?;
        }
        Ok(())
    }

    async fn list_third_party_applications(&self) -> Result<Vec<RemoteApplication>> {
        let applications: Vec<RemoteApplication> =
            self.list("/applications?isThirdParty=true").await?;
        Ok(applications
            .into_iter()
            .filter(|app| app.is_third_party)
            .collect())
    }

    async fn create_third_party_application(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<RemoteApplication> {
        self.send_json(Method::POST, "/applications", &Self::body(draft)?)
            .await
    }

    async fn update_third_party_application(
        &self,
        application_id: &str,
        draft: &ApplicationDraft,
    ) -> Result<()> {
        self.send_empty(
            Method::PATCH,
            &format!("/applications/{application_id}"),
            Some(&Self::body(draft)?),
        )
        .await
    }

    async fn delete_third_party_application(&self, application_id: &str) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/applications/{application_id}"),
            None,
        )
        .await
    }

    async fn get_application_display_name(&self, application_id: &str) -> Result<Option<String>> {
        let path = format!("/applications/{application_id}/sign-in-experience");
        let experience = not_found_as_none(self.get_json::<ApplicationSignIn>(&path).await)?;
        Ok(experience.and_then(|e| e.display_name))
    }

    async fn set_application_display_name(
        &self,
        application_id: &str,
        display_name: &str,
    ) -> Result<()> {
        self.send_empty(
            Method::PUT,
            &format!("/applications/{application_id}/sign-in-experience"),
            Some(&json!({ "displayName": display_name })),
        )
        .await
    }

    async fn get_application_consent_scopes(&self, application_id: &str) -> Result<Vec<String>> {
        let path = format!("/applications/{application_id}/user-consent-scopes");
        let scopes = not_found_as_none(self.get_json::<ConsentScopes>(&path).await)?;
        Ok(scopes.map(|s| s.user_scopes).unwrap_or_default())
    }

    async fn set_application_consent_scopes(
        &self,
        application_id: &str,
        scopes: &[String],
    ) -> Result<()> {
        self.send_empty(
            Method::PUT,
            &format!("/applications/{application_id}/user-consent-scopes"),
            Some(&json!({ "userScopes": scopes })),
        )
        .await
    }

    async fn get_access_token_claims_script(&self) -> Result<Option<String>> {
        let path = "/configs/jwt-customizer/access-token";
        let value = not_found_as_none(self.get_json::<Value>(path).await)?;
        Ok(value.as_ref().and_then(extract_script))
    }

    async fn put_access_token_claims_script(&self, script: &str) -> Result<()> {
        self.send_empty(
            Method::PUT,
            "/configs/jwt-customizer/access-token",
            Some(&json!({ "script": script })),
        )
        .await
    }

    async fn get_sign_in_experience(&self) -> Result<Value> {
        self.get_json("/sign-in-exp").await
    }

    async fn update_sign_in_experience(&self, patch: &Value) -> Result<()> {
        self.send_empty(Method::PATCH, "/sign-in-exp", Some(patch))
            .await
    }

    async fn list_connectors(&self) -> Result<Vec<RemoteConnector>> {
        // Connectors are few and the endpoint does not page.
        let page: Page<RemoteConnector> = self.get_json("/connectors").await?;
        Ok(page.into_items())
    }

    async fn create_connector(
        &self,
        connector_id: &str,
        config: &Value,
    ) -> Result<RemoteConnector> {
        self.send_json(
            Method::POST,
            "/connectors",
            &json!({ "connectorId": connector_id, "config": config }),
        )
        .await
    }

    async fn update_connector(&self, id: &str, config: &Value) -> Result<()> {
        self.send_empty(
            Method::PATCH,
            &format!("/connectors/{id}"),
            Some(&json!({ "config": config })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = DirectoryConfig::new("https://tenant.logto.app/", "id", "secret");
        assert_eq!(config.endpoint, "https://tenant.logto.app");
    }

    #[test]
    fn test_extract_script_from_object_or_array() {
        assert_eq!(
            extract_script(&json!({ "script": "return {};" })).as_deref(),
            Some("return {};")
        );
        assert_eq!(
            extract_script(&json!([{ "script": "a" }, { "script": "b" }])).as_deref(),
            Some("a")
        );
        assert_eq!(extract_script(&json!([])), None);
    }

    #[test]
    fn test_page_accepts_both_shapes() {
        let bare: Page<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        let wrapped: Page<u32> = serde_json::from_value(json!({ "data": [3] })).unwrap();
        assert_eq!(bare.into_items(), vec![1, 2]);
        assert_eq!(wrapped.into_items(), vec![3]);
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        let err = HttpDirectoryClient::new(DirectoryConfig::new("", "id", "secret")).unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }
}
