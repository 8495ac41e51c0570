use super::EtlConfig;
use std::path::PathBuf;

impl EtlConfig {
    /// Overlay `SPOTIFY_*` environment variables on top of file/default values.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPOTIFY_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Some(v) = lookup("SPOTIFY_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Some(v) = lookup("SPOTIFY_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
        if let Some(v) = lookup("SPOTIFY_TARGET_TIMEZONE") {
            self.transform.target_timezone = v;
        }
        if let Some(v) = lookup("SPOTIFY_TOKEN_PATH") {
            self.store.token_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SPOTIFY_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SPOTIFY_TABLE_NAME") {
            self.store.table_name = v;
        }
        if let Some(v) = lookup("SPOTIFY_FETCH_LIMIT") {
            match v.parse::<u32>() {
                Ok(n) => self.spotify.fetch_limit = n,
                Err(_) => tracing::warn!(value = %v, "Ignoring non-numeric SPOTIFY_FETCH_LIMIT"),
            }
        }
        if let Some(v) = lookup("SPOTIFY_CALLBACK_PORT") {
            match v.parse::<u16>() {
                Ok(n) => self.server.port = n,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid SPOTIFY_CALLBACK_PORT"),
            }
        }

        self
    }
}
