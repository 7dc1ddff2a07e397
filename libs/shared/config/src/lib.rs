use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub port: u16,
    /// Raw `"<guideId>:<months>,..."` overrides for the recurrence table
    pub well_guide_recurrence: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT={} is not a valid port, using default", raw);
                        None
                    }
                })
                .unwrap_or(3000),
            well_guide_recurrence: env::var("WELL_GUIDE_RECURRENCE_MONTHS")
                .ok()
                .filter(|raw| !raw.trim().is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
    }

    /// Bearer token used for server-side table access.
    pub fn service_token(&self) -> &str {
        self.supabase_service_role_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(service_key: Option<&str>) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_role_key: service_key.map(str::to_string),
            port: 3000,
            well_guide_recurrence: None,
        }
    }

    #[test]
    fn test_service_token_prefers_service_role_key() {
        assert_eq!(config(Some("service")).service_token(), "service");
        assert_eq!(config(None).service_token(), "anon");
    }

    #[test]
    fn test_is_configured() {
        assert!(config(None).is_configured());

        let mut missing = config(None);
        missing.supabase_url.clear();
        assert!(!missing.is_configured());
    }
}
