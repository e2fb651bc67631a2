use std::env;

use chrono::FixedOffset;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway_url: String,
    pub gateway_api_key: String,
    pub jwt_secret: String,
    /// Civil timezone offset used when comparing appointment instants against
    /// "now" (e.g. `-05:00`). Kept explicit so the app server and database
    /// cannot silently disagree on what "past" means.
    pub clinic_utc_offset: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            gateway_url: env::var("DB_GATEWAY_URL").unwrap_or_else(|_| {
                warn!("DB_GATEWAY_URL not set, using empty value");
                String::new()
            }),
            gateway_api_key: env::var("DB_GATEWAY_API_KEY").unwrap_or_else(|_| {
                warn!("DB_GATEWAY_API_KEY not set, using empty value");
                String::new()
            }),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                warn!("JWT_SECRET not set, using empty value");
                String::new()
            }),
            clinic_utc_offset: env::var("CLINIC_UTC_OFFSET").unwrap_or_else(|_| {
                warn!("CLINIC_UTC_OFFSET not set, defaulting to +00:00");
                "+00:00".to_string()
            }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.gateway_url.is_empty()
            && !self.gateway_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    /// Parsed clinic offset; falls back to UTC on a malformed value.
    pub fn clinic_offset(&self) -> FixedOffset {
        self.clinic_utc_offset.parse().unwrap_or_else(|_| {
            warn!(
                "CLINIC_UTC_OFFSET '{}' is not a valid offset, falling back to UTC",
                self.clinic_utc_offset
            );
            FixedOffset::east_opt(0).unwrap()
        })
    }
}
