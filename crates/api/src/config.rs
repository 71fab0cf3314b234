use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Fields with defaults suit local development; identity platform settings
/// have no sensible default and must be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public URL of the web frontend, used to build email redirect links.
    pub site_url: String,
    /// Access-token validation settings.
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
}

/// Where the identity platform lives and how to authenticate to it.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Project URL; the auth API is served under `/auth/v1`.
    pub url: String,
    pub anon_key: String,
    /// Enables admin lookups and `app_metadata` sync when set.
    pub service_role_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `SITE_URL`                  | `http://localhost:5173`    |
    /// | `IDENTITY_URL`              | required                   |
    /// | `IDENTITY_ANON_KEY`         | required                   |
    /// | `IDENTITY_SERVICE_ROLE_KEY` | unset                      |
    /// | `IDENTITY_JWT_SECRET`       | required                   |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value fails to parse.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let site_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            site_url,
            jwt: JwtConfig::from_env(),
            identity: IdentityConfig::from_env(),
        }
    }

    /// Where password recovery emails send the user.
    pub fn password_reset_redirect(&self) -> String {
        format!("{}/auth/update-password", self.site_url)
    }
}

impl IdentityConfig {
    /// # Panics
    ///
    /// Panics if `IDENTITY_URL` or `IDENTITY_ANON_KEY` is unset.
    pub fn from_env() -> Self {
        let url = std::env::var("IDENTITY_URL").expect("IDENTITY_URL must be set");
        let anon_key = std::env::var("IDENTITY_ANON_KEY").expect("IDENTITY_ANON_KEY must be set");
        let service_role_key = std::env::var("IDENTITY_SERVICE_ROLE_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        if service_role_key.is_none() {
            tracing::warn!("IDENTITY_SERVICE_ROLE_KEY not set; admin user lookups are disabled");
        }
        Self {
            url,
            anon_key,
            service_role_key,
        }
    }
}
