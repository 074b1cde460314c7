//! Server configuration

use serde::Deserialize;

/// Origin of the local dashboard, always allowed by CORS
pub const DEV_DASHBOARD_ORIGIN: &str = "http://localhost:5173";

/// Server configuration, read from environment variables
///
/// # Environment Variables
/// - `PORT`: Listening port (default: 8080)
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `API_BASE_URL`: Prefix of every API route (default: /api/v1)
/// - `CORS_ORIGIN`: Additional allowed origin
/// - `RATE_LIMIT_WINDOW_SECS`: Rate limit window (default: 900)
/// - `RATE_LIMIT_MAX_REQUESTS`: Requests per window per client
///   (default: 100 in production, 100000 in development)
/// - `SUPERADMIN_PASSWORD`: Password of the bootstrap account (default: root)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub app_env: String,
    pub api_base_url: String,
    pub cors_origin: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: Option<u32>,
    pub superadmin_password: String,
}

impl ServerConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("port", 8080)?
            .set_default("app_env", "development")?
            .set_default("api_base_url", "/api/v1")?
            .set_default("rate_limit_window_secs", 900)?
            .set_default("superadmin_password", "root")?
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit_max_requests
            .unwrap_or(if self.is_production() { 100 } else { 100_000 })
    }

    /// Allowed CORS origins
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self
            .cors_origin
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !origins.iter().any(|o| o == DEV_DASHBOARD_ORIGIN) {
            origins.push(DEV_DASHBOARD_ORIGIN.to_string());
        }
        origins
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            app_env: "development".to_string(),
            api_base_url: "/api/v1".to_string(),
            cors_origin: None,
            rate_limit_window_secs: 900,
            rate_limit_max_requests: None,
            superadmin_password: "root".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "PORT",
        "APP_ENV",
        "CORS_ORIGIN",
        "RATE_LIMIT_MAX_REQUESTS",
        "SUPERADMIN_PASSWORD",
    ];

    fn clear() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = ServerConfig::load().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base_url, "/api/v1");
        assert!(!config.is_production());
        assert_eq!(config.rate_limit_max_requests(), 100_000);
        assert_eq!(config.superadmin_password, "root");
        assert_eq!(config.cors_origins(), vec![DEV_DASHBOARD_ORIGIN.to_string()]);
    }

    #[test]
    #[serial]
    fn production_overrides() {
        clear();
        unsafe {
            std::env::set_var("PORT", "9090");
            std::env::set_var("APP_ENV", "production");
            std::env::set_var("CORS_ORIGIN", "https://bikanerelite.com");
        }

        let config = ServerConfig::load().unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.is_production());
        assert_eq!(config.rate_limit_max_requests(), 100);
        assert_eq!(
            config.cors_origins(),
            vec![
                "https://bikanerelite.com".to_string(),
                DEV_DASHBOARD_ORIGIN.to_string()
            ]
        );
        clear();
    }
}
