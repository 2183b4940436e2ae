//! In-memory session cookies captured from the login response.

use reqwest::Response;

/// Cookies issued by the directory on a successful login. Lives only as long
/// as the client that captured it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Collect the name and value of every cookie the response sets.
    /// Attributes (`path`, `expires`, ...) are dropped; a later cookie with
    /// the same name replaces an earlier one.
    #[must_use]
    pub fn from_response(resp: &Response) -> Self {
        let mut session = Self::default();
        for cookie in resp.cookies() {
            if cookie.name().is_empty() {
                continue;
            }
            session.set(cookie.name(), cookie.value());
        }
        session
    }

    fn set(&mut self, name: &str, value: &str) {
        match self.cookies.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Value for a `Cookie` request header.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn session_from(set_cookies: &[&str]) -> Session {
        let mut server = mockito::Server::new_async().await;
        let mut mock = server.mock("GET", "/").with_status(200);
        for value in set_cookies {
            mock = mock.with_header("set-cookie", value);
        }
        let _mock = mock.create_async().await;

        let resp = reqwest::get(server.url()).await.unwrap();
        Session::from_response(&resp)
    }

    #[tokio::test]
    async fn collects_cookies_without_attributes() {
        let session = session_from(&[
            "bb_user=alice%7C123; path=/; httponly",
            "bb_pass=abc; expires=Wed, 21 Oct 2026 07:28:00 GMT",
        ])
        .await;
        assert_eq!(session.len(), 2);
        assert_eq!(session.cookie_header(), "bb_user=alice%7C123; bb_pass=abc");
    }

    #[tokio::test]
    async fn quoted_values_keep_their_content() {
        let session = session_from(&[r#"token="a b"; path=/"#]).await;
        assert_eq!(session.len(), 1);
        assert!(session.cookie_header().starts_with("token="));
    }

    #[tokio::test]
    async fn later_cookie_replaces_earlier() {
        let session = session_from(&["token=old", "token=new; path=/"]).await;
        assert_eq!(session.cookie_header(), "token=new");
    }

    #[tokio::test]
    async fn skips_malformed_cookies() {
        let session = session_from(&["no-equals-sign", "=orphan"]).await;
        assert!(session.is_empty());
    }
}
