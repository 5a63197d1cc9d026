use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";
pub const DEFAULT_BANNER_TTL: Duration = Duration::from_secs(5);
const DEVELOPMENT_BASE_URL: &str = "http://localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    #[default]
    Development,
    Other,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Other => "other",
        }
    }
}

/// What to do with a product price that does not parse to a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePolicy {
    /// Send it anyway; the non-finite value goes out as JSON `null`.
    #[default]
    PassThrough,
    /// Refuse to submit and report a validation error on the lane.
    RejectNonFinite,
}

impl PricePolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pass_through" | "passthrough" => Some(Self::PassThrough),
            "reject_non_finite" | "reject" => Some(Self::RejectNonFinite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub environment: Environment,
    /// Explicit API base URL; only honoured in production.
    pub api_url: Option<String>,
    /// Stand-in for the page origin a browser build would fall back to.
    pub page_origin: String,
    pub banner_ttl: Duration,
    pub price_policy: PricePolicy,
    /// No timeout unless configured.
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            api_url: None,
            page_origin: DEVELOPMENT_BASE_URL.into(),
            banner_ttl: DEFAULT_BANNER_TTL,
            price_policy: PricePolicy::default(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    environment: Option<String>,
    api_url: Option<String>,
    page_origin: Option<String>,
    banner_ttl_ms: Option<u64>,
    price_policy: Option<PricePolicy>,
    request_timeout_secs: Option<u64>,
}

/// Builds settings from defaults, then the TOML file, then the process
/// environment. An explicitly named file must exist; the default
/// `storefront.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &path, &raw)?,
        Err(source) if required => return Err(ConfigError::Read { path, source }),
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path, raw: &str) -> Result<(), ConfigError> {
    let file_cfg: FileSettings = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(v) = file_cfg.environment {
        settings.environment = Environment::parse(&v);
    }
    if let Some(v) = file_cfg.api_url {
        settings.api_url = Some(v);
    }
    if let Some(v) = file_cfg.page_origin {
        settings.page_origin = v;
    }
    if let Some(v) = file_cfg.banner_ttl_ms {
        settings.banner_ttl = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.price_policy {
        settings.price_policy = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Some(Duration::from_secs(v));
    }
    Ok(())
}

/// Later keys win: `APP__*` overrides the short form.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["APP_ENV", "APP__ENVIRONMENT"] {
        if let Some(v) = lookup(key) {
            settings.environment = Environment::parse(&v);
        }
    }
    for key in ["API_URL", "APP__API_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_url = Some(v);
        }
    }
    for key in ["PAGE_ORIGIN", "APP__PAGE_ORIGIN"] {
        if let Some(v) = lookup(key) {
            settings.page_origin = v;
        }
    }

    if let Some(v) = lookup("APP__BANNER_TTL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.banner_ttl = Duration::from_millis(parsed);
        }
    }
    if let Some(policy) = lookup("APP__PRICE_POLICY").and_then(|v| PricePolicy::parse(&v)) {
        settings.price_policy = policy;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Some(Duration::from_secs(parsed));
        }
    }
}

/// The two collection URLs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub base_url: String,
    pub users_url: String,
    pub products_url: String,
}

impl ServiceEndpoints {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let base = match (settings.environment, settings.api_url.as_deref()) {
            (Environment::Production, Some(api_url)) if !api_url.trim().is_empty() => api_url,
            (Environment::Development, _) => DEVELOPMENT_BASE_URL,
            _ => settings.page_origin.as_str(),
        };
        let endpoints = Self::from_base(base)?;

        info!(
            environment = settings.environment.as_str(),
            api_base_url = %endpoints.base_url,
            user_service_url = %endpoints.users_url,
            product_service_url = %endpoints.products_url,
            "api configuration"
        );
        Ok(endpoints)
    }

    pub fn from_base(base: &str) -> Result<Self, ConfigError> {
        let base_url = base.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|source| ConfigError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::NotABase(base_url));
        }

        Ok(Self {
            users_url: format!("{base_url}/users"),
            products_url: format!("{base_url}/products"),
            base_url,
        })
    }
}
