use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; it is pulled into handlers and extractors from `AppState`
/// via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the dev bypass and the local fallbacks.
    pub env: Env,
    // Postgres connection string. `None` (local only) selects the in-memory store.
    pub db_url: Option<String>,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // HS256 secret for session tokens and decision links.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub link_ttl_hours: i64,
    // When false, approve/reject links are bare ids without a signed token.
    pub signed_links: bool,
    pub bcrypt_cost: u32,
    // Externally reachable base URL of this API, used to build email links.
    pub public_url: String,
    // Base URL of the dashboard SPA, used by the decision pages.
    pub frontend_url: String,
    // Mail API endpoint. `None` (local only) selects the recording mock mailer.
    pub mail_api_url: Option<String>,
    pub mail_api_key: String,
    pub mail_from: String,
    pub seed_admin: Option<SeedAdmin>,
}

/// Env
///
/// Switches between development conveniences (in-memory store, mock mailer, header
/// bypass) and the hardened production setup.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// SeedAdmin
///
/// Credentials of the administrator created at startup when none exists yet.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

const LOCAL_JWT_SECRET: &str = "vms-local-development-secret";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test state. The bcrypt cost is the minimum so
    /// tests that create users stay fast.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            token_ttl_hours: 24,
            link_ttl_hours: 72,
            signed_links: true,
            bcrypt_cost: 4,
            public_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            mail_api_url: None,
            mail_api_key: String::new(),
            mail_from: "VMS <no-reply@vms.local>".to_string(),
            seed_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment (after `dotenv`) and fails fast.
    ///
    /// # Panics
    /// Panics in production when any of `DATABASE_URL`, `JWT_SECRET`, `MAIL_API_URL`,
    /// `MAIL_API_KEY`, `MAIL_FROM`, `FRONTEND_URL` or `PUBLIC_URL` is missing, and in
    /// any environment when a numeric or boolean variable cannot be parsed.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let seed_admin = match (
            env::var("SEED_ADMIN_EMAIL"),
            env::var("SEED_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SeedAdmin {
                name: env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "Admin User".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let token_ttl_hours = parse_var("TOKEN_TTL_HOURS", 24);
        let link_ttl_hours = parse_var("LINK_TTL_HOURS", 72);
        let signed_links = parse_var("SIGNED_LINKS", true);
        let bcrypt_cost = parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST);

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                bind_addr,
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                token_ttl_hours,
                link_ttl_hours,
                signed_links,
                bcrypt_cost,
                public_url: env::var("PUBLIC_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
                mail_api_url: env::var("MAIL_API_URL").ok(),
                mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
                mail_from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "VMS <no-reply@vms.local>".to_string()),
                seed_admin,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(required("DATABASE_URL")),
                bind_addr,
                jwt_secret: required("JWT_SECRET"),
                token_ttl_hours,
                link_ttl_hours,
                signed_links,
                bcrypt_cost,
                public_url: required("PUBLIC_URL"),
                frontend_url: required("FRONTEND_URL"),
                mail_api_url: Some(required("MAIL_API_URL")),
                mail_api_key: required("MAIL_API_KEY"),
                mail_from: required("MAIL_FROM"),
                seed_admin,
            },
        }
    }
}

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("FATAL: {} must be set in production.", name))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {} has an invalid value: {}", name, raw)),
        Err(_) => default,
    }
}
