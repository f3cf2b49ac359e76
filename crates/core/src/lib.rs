pub mod compose;
pub mod deck;
pub mod fetch;
pub mod report;
pub mod theme;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_key: Option<String>,
        pub app_base_url: Option<String>,
        pub public_dir: String,
        pub logo_fetch_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let logo_fetch_timeout_secs = match std::env::var("LOGO_FETCH_TIMEOUT_SECS") {
                Ok(s) => s
                    .parse::<u64>()
                    .context("LOGO_FETCH_TIMEOUT_SECS must be an integer number of seconds")?,
                Err(_) => 10,
            };

            Ok(Self {
                api_key: std::env::var("API_KEY").ok().filter(|s| !s.is_empty()),
                app_base_url: std::env::var("APP_BASE_URL").ok(),
                public_dir: std::env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()),
                logo_fetch_timeout_secs,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }
}
