//! Provider authorization endpoint.

use crate::config::OAuthConfig;

/// Where the user is sent to grant access.
#[derive(Clone, Debug)]
pub struct OAuthProvider {
    auth_url: String,
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl OAuthProvider {
    pub fn new(config: &OAuthConfig) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }

    /// Build authorization URL with redirect_uri and, when given, a state.
    ///
    /// Only pass a state the serving process issued itself; `/callback`
    /// rejects any state it does not know.
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        let scopes = self.scopes.join(" ");
        let mut url = format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(state));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let config = OAuthConfig {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scopes: vec![
                "user-read-recently-played".to_string(),
                "user-top-read".to_string(),
            ],
            ..OAuthConfig::default()
        };

        let url = OAuthProvider::new(&config).authorize_url(Some("random_state"));

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("scope=user-read-recently-played%20user-top-read"));
        assert!(url.contains("state=random_state"));
        assert!(url.contains("response_type=code"));
        assert!(!url.contains("test_secret"));
    }

    #[test]
    fn test_authorize_url_without_state() {
        let config = OAuthConfig {
            client_id: "test_client_id".to_string(),
            ..OAuthConfig::default()
        };

        let url = OAuthProvider::new(&config).authorize_url(None);

        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("scope=user-read-recently-played"));
        assert!(!url.contains("state="));
    }
}
