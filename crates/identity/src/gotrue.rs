//! REST client for a GoTrue-compatible auth service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{extract_message, IdentityError};
use crate::models::{
    Challenge, Session, SignUpResult, TotpEnrollment, User, UserUpdate, FACTOR_TYPE_TOTP,
};
use crate::provider::IdentityProvider;

/// HTTP client for the identity platform's `/auth/v1` API.
pub struct GoTrueClient {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl GoTrueClient {
    /// Create a client for the platform at `project_url`.
    ///
    /// * `anon_key` - Public API key sent with every request.
    /// * `service_role_key` - Privileged key for `admin_*` calls; without it
    ///   those calls fail with [`IdentityError::NotConfigured`].
    pub fn new(project_url: &str, anon_key: String, service_role_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), project_url, anon_key, service_role_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        project_url: &str,
        anon_key: String,
        service_role_key: Option<String>,
    ) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key,
            service_role_key,
        }
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.auth_url)
    }

    /// A request authenticated as the anonymous client.
    fn public(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// A request acting as the user who owns `access_token`.
    fn as_user(
        &self,
        method: reqwest::Method,
        path: &str,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    /// A user request to `/factors/{factor_id}[/{action}]`.
    ///
    /// The id comes from the client and is escaped as a single path segment.
    fn factor_request(
        &self,
        method: reqwest::Method,
        factor_id: &str,
        action: Option<&str>,
        access_token: &str,
    ) -> Result<reqwest::RequestBuilder, IdentityError> {
        if factor_id.is_empty() || factor_id == "." || factor_id == ".." {
            return Err(IdentityError::InvalidInput(format!(
                "invalid factor id '{factor_id}'"
            )));
        }
        let mut url = reqwest::Url::parse(&self.url("/factors"))
            .map_err(|_| IdentityError::NotConfigured("IDENTITY_URL is not a valid URL"))?;
        url.path_segments_mut()
            .map_err(|()| IdentityError::NotConfigured("IDENTITY_URL is not a valid URL"))?
            .push(factor_id)
            .extend(action);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token))
    }

    /// A request using the service role key.
    fn as_admin(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, IdentityError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or(IdentityError::NotConfigured("IDENTITY_SERVICE_ROLE_KEY is not set"))?;
        Ok(self
            .client
            .request(method, self.url(path))
            .header("apikey", key)
            .bearer_auth(key))
    }

    /// Return the response unchanged on 2xx, otherwise an
    /// [`IdentityError::Api`] carrying the platform's message.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = extract_message(&body);
            tracing::debug!(status = status.as_u16(), %message, "Identity API error");
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IdentityError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), IdentityError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpResult, IdentityError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": metadata,
        });
        let response = self
            .public(reqwest::Method::POST, "/signup")
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .public(reqwest::Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .public(reqwest::Method::POST, "/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .as_user(reqwest::Method::POST, "/logout", access_token)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let body = serde_json::json!({ "email": email });
        let response = self
            .public(reqwest::Method::POST, "/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError> {
        let response = self
            .as_user(reqwest::Method::GET, "/user", access_token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<User, IdentityError> {
        let response = self
            .as_user(reqwest::Method::PUT, "/user", access_token)
            .json(update)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn enroll_totp(&self, access_token: &str) -> Result<TotpEnrollment, IdentityError> {
        let body = serde_json::json!({ "factor_type": FACTOR_TYPE_TOTP });
        let response = self
            .as_user(reqwest::Method::POST, "/factors", access_token)
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn challenge_and_verify(
        &self,
        access_token: &str,
        factor_id: &str,
        code: &str,
    ) -> Result<Session, IdentityError> {
        let response = self
            .factor_request(reqwest::Method::POST, factor_id, Some("challenge"), access_token)?
            .send()
            .await?;
        let challenge: Challenge = Self::parse_response(response).await?;

        let body = serde_json::json!({ "challenge_id": challenge.id, "code": code });
        let response = self
            .factor_request(reqwest::Method::POST, factor_id, Some("verify"), access_token)?
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn unenroll_factor(
        &self,
        access_token: &str,
        factor_id: &str,
    ) -> Result<(), IdentityError> {
        let response = self
            .factor_request(reqwest::Method::DELETE, factor_id, None, access_token)?
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn admin_get_user(&self, user_id: Uuid) -> Result<User, IdentityError> {
        let response = self
            .as_admin(reqwest::Method::GET, &format!("/admin/users/{user_id}"))?
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn admin_update_app_metadata(
        &self,
        user_id: Uuid,
        app_metadata: serde_json::Value,
    ) -> Result<User, IdentityError> {
        let body = serde_json::json!({ "app_metadata": app_metadata });
        let response = self
            .as_admin(reqwest::Method::PUT, &format!("/admin/users/{user_id}"))?
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}
