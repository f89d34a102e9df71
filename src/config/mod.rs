use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database = DatabaseConfig {
            username: get_str("OKR_DB_USERNAME", "okruser"),
            password: get_str("OKR_DB_PASSWORD", ""),
            server: get_str("OKR_DB_SERVER", "localhost"),
            port: get_u32("OKR_DB_PORT", 5432),
            database: get_str("OKR_DB_NAME", "okrcore"),
        };
        AppConfig { database }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }
}

fn get_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
