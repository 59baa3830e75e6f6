pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::credentials::CredentialVerifier;
use crate::config::AppConfig;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub token_key: [u8; 32],
    pub access_ttl_minutes: u64,
}

impl AppState {
    pub fn new(db: Db, config: &AppConfig) -> Self {
        Self {
            db,
            token_key: config.token_key,
            access_ttl_minutes: config.access_ttl_minutes,
        }
    }

    pub fn credentials(&self) -> CredentialVerifier {
        CredentialVerifier::new(self.token_key, self.access_ttl_minutes)
    }
}
