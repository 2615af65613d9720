//! Runtime configuration read from the environment
//!
//! - `PORT` - Server port number (default: 8080)
//! - `DATABASE_URL` - Path to the database file (default: "data.db")
//! - `AUTHORIZATION` - Dashboard token; unset or empty disables the check
//! - `RUST_LOG` - Log filter (default: "listings=debug,tower_http=debug")

use std::env;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE: &str = "data.db";
pub const DEFAULT_LOG_FILTER: &str = "listings=debug,tower_http=debug";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub auth_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let database_path =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        let auth_token = env::var("AUTHORIZATION").ok().filter(|t| !t.is_empty());

        Self {
            port,
            database_path,
            auth_token,
        }
    }
}
