#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use rolegate_api::auth::jwt::{validate_token, Aal, JwtConfig, DEFAULT_AUDIENCE};
use rolegate_api::config::{IdentityConfig, ServerConfig};
use rolegate_api::router::build_app_router;
use rolegate_api::state::AppState;
use rolegate_db::models::user_role::{AssignOutcome, AssignRole};
use rolegate_db::repositories::{RoleRepo, UserRoleRepo};
use rolegate_identity::models::{
    Factor, Session, SignUpResult, TotpEnrollment, TotpSecret, User, UserUpdate,
    FACTOR_STATUS_VERIFIED, FACTOR_TYPE_TOTP,
};
use rolegate_identity::{IdentityError, IdentityProvider};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const PASSWORD: &str = "correct-horse";
pub const TOTP_CODE: &str = "123456";

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        site_url: "http://localhost:5173".to_string(),
        jwt: jwt_config(),
        identity: IdentityConfig {
            url: "http://identity.invalid".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: Some("service".to_string()),
        },
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: JWT_SECRET.to_string(),
        audience: DEFAULT_AUDIENCE.to_string(),
    }
}

/// Build the production router over `pool` with an in-memory identity platform.
pub fn build_test_app(pool: PgPool) -> (Router, Arc<FakeIdentity>) {
    let identity = Arc::new(FakeIdentity::default());
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
        identity: identity.clone(),
    };
    (build_app_router(state), identity)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Sign an access token the way the identity platform would.
pub fn mint_token(user_id: Uuid, email: &str, aal: Aal) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": user_id,
        "aud": DEFAULT_AUDIENCE,
        "exp": now + 3600,
        "iat": now,
        "email": email,
        "aal": aal,
        "session_id": Uuid::new_v4(),
        "app_metadata": {},
        "user_metadata": {},
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// A user registered on the fake platform, optionally holding a role.
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    /// An `aal1` session token.
    pub token: String,
}

impl TestUser {
    pub fn aal2_token(&self) -> String {
        mint_token(self.id, &self.email, Aal::Aal2)
    }
}

/// Register `email` on the fake platform and give it `role` (by name) in the
/// database, recorded as a system assignment.
pub async fn seed_user(
    pool: &PgPool,
    identity: &FakeIdentity,
    email: &str,
    role: Option<&str>,
) -> TestUser {
    let metadata = json!({ "first_name": "Test", "last_name": email });
    let id = identity.add_user(email, PASSWORD, metadata);
    if let Some(role) = role {
        let role = RoleRepo::find_by_name(pool, role).await.unwrap().unwrap();
        let outcome = UserRoleRepo::assign(
            pool,
            &AssignRole {
                user_id: id,
                role_id: role.id,
                assigned_by: None,
                expected_role_id: None,
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, AssignOutcome::Assigned { .. }));
    }
    TestUser {
        id,
        email: email.to_string(),
        token: mint_token(id, email, Aal::Aal1),
    }
}

// ---------------------------------------------------------------------------
// In-memory identity platform
// ---------------------------------------------------------------------------

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<Uuid, Account>,
    refresh_tokens: HashMap<String, Uuid>,
    failing_lookups: HashSet<Uuid>,
    obfuscate_duplicates: bool,
    sign_in_down: bool,
    recovery_emails: Vec<(String, String)>,
    metadata_syncs: Vec<(Uuid, Value)>,
    signed_out: Vec<Uuid>,
}

/// Stand-in for the identity platform that issues real HS256 tokens signed
/// with [`JWT_SECRET`].
#[derive(Default)]
pub struct FakeIdentity {
    state: Mutex<FakeState>,
}

fn api_error(status: u16, message: &str) -> IdentityError {
    IdentityError::Api {
        status,
        message: message.to_string(),
    }
}

impl FakeIdentity {
    pub fn add_user(&self, email: &str, password: &str, metadata: Value) -> Uuid {
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: Some(email.to_string()),
            user_metadata: metadata,
            app_metadata: json!({}),
            factors: Vec::new(),
            created_at: Some(chrono::Utc::now()),
            last_sign_in_at: None,
            identities: Some(vec![json!({ "provider": "email" })]),
        };
        self.state.lock().unwrap().accounts.insert(
            id,
            Account {
                user,
                password: password.to_string(),
            },
        );
        id
    }

    /// Give the user an already verified TOTP factor.
    pub fn add_verified_factor(&self, user_id: Uuid) -> String {
        let factor_id = format!("factor-{}", Uuid::new_v4());
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.get_mut(&user_id).unwrap();
        account.user.factors.push(Factor {
            id: factor_id.clone(),
            factor_type: FACTOR_TYPE_TOTP.to_string(),
            status: FACTOR_STATUS_VERIFIED.to_string(),
            friendly_name: None,
            created_at: None,
        });
        factor_id
    }

    /// Make admin lookups of `user_id` fail.
    pub fn break_lookup(&self, user_id: Uuid) {
        self.state.lock().unwrap().failing_lookups.insert(user_id);
    }

    /// Answer repeated sign-ups the way GoTrue does with email confirmation
    /// on: a placeholder user with a fresh id instead of an error.
    pub fn obfuscate_duplicate_sign_ups(&self) {
        self.state.lock().unwrap().obfuscate_duplicates = true;
    }

    /// Make password grants fail with a 503.
    pub fn break_sign_in(&self) {
        self.state.lock().unwrap().sign_in_down = true;
    }

    pub fn user(&self, user_id: Uuid) -> User {
        self.state.lock().unwrap().accounts[&user_id].user.clone()
    }

    pub fn password(&self, user_id: Uuid) -> String {
        self.state.lock().unwrap().accounts[&user_id].password.clone()
    }

    pub fn user_id_by_email(&self, email: &str) -> Option<Uuid> {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .values()
            .find(|a| a.user.email.as_deref() == Some(email))
            .map(|a| a.user.id)
    }

    pub fn recovery_emails(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().recovery_emails.clone()
    }

    pub fn metadata_syncs(&self) -> Vec<(Uuid, Value)> {
        self.state.lock().unwrap().metadata_syncs.clone()
    }

    pub fn signed_out(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().signed_out.clone()
    }

    fn session(&self, user: &User, aal: Aal) -> Session {
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        self.state
            .lock()
            .unwrap()
            .refresh_tokens
            .insert(refresh_token.clone(), user.id);
        Session {
            access_token: mint_token(user.id, user.email.as_deref().unwrap_or_default(), aal),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            refresh_token,
            user: user.clone(),
        }
    }

    fn caller(&self, access_token: &str) -> Result<Uuid, IdentityError> {
        let claims = validate_token(access_token, &jwt_config())
            .map_err(|_| api_error(401, "invalid JWT"))?;
        if self.state.lock().unwrap().accounts.contains_key(&claims.sub) {
            Ok(claims.sub)
        } else {
            Err(api_error(404, "User not found"))
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<SignUpResult, IdentityError> {
        if self.user_id_by_email(email).is_some() {
            if !self.state.lock().unwrap().obfuscate_duplicates {
                return Err(api_error(422, "User already registered"));
            }
            return Ok(SignUpResult::Pending(User {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                user_metadata: metadata,
                app_metadata: json!({}),
                factors: Vec::new(),
                created_at: Some(chrono::Utc::now()),
                last_sign_in_at: None,
                identities: Some(Vec::new()),
            }));
        }
        let id = self.add_user(email, password, metadata);
        Ok(SignUpResult::Pending(self.user(id)))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let user = {
            let state = self.state.lock().unwrap();
            if state.sign_in_down {
                return Err(api_error(503, "Service unavailable"));
            }
            state
                .accounts
                .values()
                .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
                .map(|a| a.user.clone())
        };
        match user {
            Some(user) => Ok(self.session(&user, Aal::Aal1)),
            None => Err(api_error(400, "Invalid login credentials")),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let user_id = self
            .state
            .lock()
            .unwrap()
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| api_error(400, "Invalid Refresh Token: Refresh Token Not Found"))?;
        Ok(self.session(&self.user(user_id), Aal::Aal1))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let id = self.caller(access_token)?;
        self.state.lock().unwrap().signed_out.push(id);
        Ok(())
    }

    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        self.state
            .lock()
            .unwrap()
            .recovery_emails
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError> {
        let id = self.caller(access_token)?;
        Ok(self.user(id))
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<User, IdentityError> {
        let id = self.caller(access_token)?;
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.get_mut(&id).unwrap();
        if let Some(password) = &update.password {
            account.password = password.clone();
        }
        if let Some(Value::Object(data)) = &update.data {
            if !account.user.user_metadata.is_object() {
                account.user.user_metadata = json!({});
            }
            for (key, value) in data {
                account.user.user_metadata[key] = value.clone();
            }
        }
        // Email changes stay pending until confirmed, as on the real platform.
        Ok(account.user.clone())
    }

    async fn enroll_totp(&self, access_token: &str) -> Result<TotpEnrollment, IdentityError> {
        let id = self.caller(access_token)?;
        let factor_id = format!("factor-{}", Uuid::new_v4());
        let mut state = self.state.lock().unwrap();
        state.accounts.get_mut(&id).unwrap().user.factors.push(Factor {
            id: factor_id.clone(),
            factor_type: FACTOR_TYPE_TOTP.to_string(),
            status: "unverified".to_string(),
            friendly_name: None,
            created_at: None,
        });
        Ok(TotpEnrollment {
            id: factor_id,
            factor_type: FACTOR_TYPE_TOTP.to_string(),
            totp: TotpSecret {
                qr_code: "data:image/svg+xml;utf-8,<svg/>".to_string(),
                secret: "JBSWY3DPEHPK3PXP".to_string(),
                uri: "otpauth://totp/rolegate".to_string(),
            },
        })
    }

    async fn challenge_and_verify(
        &self,
        access_token: &str,
        factor_id: &str,
        code: &str,
    ) -> Result<Session, IdentityError> {
        let id = self.caller(access_token)?;
        let user = {
            let mut state = self.state.lock().unwrap();
            let account = state.accounts.get_mut(&id).unwrap();
            let factor = account
                .user
                .factors
                .iter_mut()
                .find(|f| f.id == factor_id)
                .ok_or_else(|| api_error(404, "Factor not found"))?;
            if code != TOTP_CODE {
                return Err(api_error(422, "Invalid TOTP code entered"));
            }
            factor.status = FACTOR_STATUS_VERIFIED.to_string();
            account.user.clone()
        };
        Ok(self.session(&user, Aal::Aal2))
    }

    async fn unenroll_factor(
        &self,
        access_token: &str,
        factor_id: &str,
    ) -> Result<(), IdentityError> {
        let id = self.caller(access_token)?;
        let mut state = self.state.lock().unwrap();
        let factors = &mut state.accounts.get_mut(&id).unwrap().user.factors;
        let before = factors.len();
        factors.retain(|f| f.id != factor_id);
        if factors.len() == before {
            return Err(api_error(404, "Factor not found"));
        }
        Ok(())
    }

    async fn admin_get_user(&self, user_id: Uuid) -> Result<User, IdentityError> {
        let state = self.state.lock().unwrap();
        if state.failing_lookups.contains(&user_id) {
            return Err(api_error(500, "lookup failed"));
        }
        state
            .accounts
            .get(&user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| api_error(404, "User not found"))
    }

    async fn admin_update_app_metadata(
        &self,
        user_id: Uuid,
        app_metadata: Value,
    ) -> Result<User, IdentityError> {
        let mut state = self.state.lock().unwrap();
        state.metadata_syncs.push((user_id, app_metadata.clone()));
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| api_error(404, "User not found"))?;
        account.user.app_metadata = app_metadata;
        Ok(account.user.clone())
    }
}
