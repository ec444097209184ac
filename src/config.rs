use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Unset means the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub max_concurrent_requests: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(5000);
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let max_concurrent_requests = match env::var("MAX_CONCURRENT_REQUESTS") {
            Ok(raw) => raw.parse::<usize>().map_err(|err| {
                anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be a positive integer: {err}")
            })?,
            Err(_) => 100,
        };

        Ok(Self {
            database_url,
            host,
            port,
            frontend_url,
            max_concurrent_requests,
        })
    }
}
