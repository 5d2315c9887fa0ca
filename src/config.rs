use std::collections::HashMap;

use anyhow::{Context, Result, bail};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:4173"];
const DEFAULT_QR_SIZE: u32 = 300;
const DEFAULT_QR_MARGIN: u32 = 10;

/// Server settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub backend_url: String,
    /// Origin placed in dynamic QR data: `{origin}/qr/{short_code}`.
    pub public_origin: String,
    pub allowed_origins: Vec<String>,
    /// Origins logos may be fetched from. Always holds the backend's origin.
    pub asset_origins: Vec<String>,
    pub default_qr_size: u32,
    pub default_qr_margin: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .context("PORT not set")?
            .parse::<u16>()
            .context("PORT must be a port number")?;

        let backend_url = var("BACKEND_URL")
            .context("BACKEND_URL not set")?
            .trim_end_matches('/')
            .to_string();
        let backend_origin =
            http_origin(&backend_url).context("BACKEND_URL must be an http(s) URL")?;

        let mut asset_origins = vec![backend_origin];
        for origin in comma_list(var("ASSET_ORIGINS")) {
            let origin = http_origin(&origin)
                .with_context(|| format!("ASSET_ORIGINS entry {:?} is not an http(s) URL", origin))?;
            if !asset_origins.contains(&origin) {
                asset_origins.push(origin);
            }
        }

        let public_origin = var("PUBLIC_ORIGIN")
            .map(|origin| origin.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(list) => comma_list(Some(list)),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            port,
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            backend_url,
            public_origin,
            allowed_origins,
            asset_origins,
            default_qr_size: parse_or(var("DEFAULT_QR_SIZE"), "DEFAULT_QR_SIZE", DEFAULT_QR_SIZE)?,
            default_qr_margin: parse_or(
                var("DEFAULT_QR_MARGIN"),
                "DEFAULT_QR_MARGIN",
                DEFAULT_QR_MARGIN,
            )?,
        })
    }

    /// Whether `url` may be fetched as a logo: http(s) on an asset origin.
    pub fn is_asset_url(&self, url: &reqwest::Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && self
                .asset_origins
                .contains(&url.origin().ascii_serialization())
    }
}

/// `scheme://host[:port]` of an http(s) URL.
fn http_origin(value: &str) -> Result<String> {
    let url = reqwest::Url::parse(value.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme {:?}", url.scheme());
    }
    Ok(url.origin().ascii_serialization())
}

fn comma_list(value: Option<String>) -> Vec<String> {
    value
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_or(value: Option<String>, key: &str, default: u32) -> Result<u32> {
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} must be a positive integer", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        port: 8080,
        bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        backend_url: "http://backend.test/api".to_string(),
        public_origin: "https://qr.example.com".to_string(),
        allowed_origins: vec![],
        asset_origins: vec![
            "http://backend.test".to_string(),
            "https://cdn.example.com".to_string(),
        ],
        default_qr_size: 120,
        default_qr_margin: 10,
    }
}
