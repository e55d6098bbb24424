use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub encryption_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
        };

        let slack = SlackConfig {
            client_id: env::var("SLACK_CLIENT_ID").context("SLACK_CLIENT_ID must be set")?,
            client_secret: env::var("SLACK_CLIENT_SECRET")
                .context("SLACK_CLIENT_SECRET must be set")?,
            redirect_uri: env::var("SLACK_REDIRECT_URI")
                .context("SLACK_REDIRECT_URI must be set")?,
        };

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3050".to_string())
                .parse()
                .context("PORT must be a number")?,
        };

        let security = SecurityConfig {
            encryption_key: env::var("ENCRYPTION_KEY")
                .context("ENCRYPTION_KEY must be set (32-byte base64 encoded key)")?,
        };

        Ok(Config {
            database,
            slack,
            server,
            security,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
