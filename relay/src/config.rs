use std::env;

/// Runtime configuration for the relay service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database path; `:memory:` is accepted.
    pub db_path: String,
    /// Reserved sender name used for the connection welcome message.
    pub welcome_sender: String,
    pub welcome_photo_url: String,
    pub welcome_text: String,
    /// Window within which an identical welcome suppresses a new one.
    pub welcome_window_ms: i64,
    /// Default number of rows served by the history endpoint.
    pub history_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let db_path = env::var("CLASSCHAT_DB").unwrap_or_else(|_| "classchat.db".to_string());
        let welcome_text = env::var("CLASSCHAT_WELCOME_TEXT")
            .unwrap_or_else(|_| "Welcome to the class chat!".to_string());
        Ok(Self {
            host,
            port,
            db_path,
            welcome_sender: "ClassBot".to_string(),
            welcome_photo_url: String::new(),
            welcome_text,
            welcome_window_ms: 60_000,
            history_limit: 50,
        })
    }
}
