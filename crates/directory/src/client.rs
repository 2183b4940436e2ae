//! HTTP side of the directory: login, page fetch, vote submission.
//!
//! Login and vote are not idempotent on the remote side, so nothing in this
//! module retries. Redirects are never followed: the login and vote
//! endpoints signal success with a redirect.

use std::time::Duration;

use {
    async_trait::async_trait,
    compat_config::DirectoryConfig,
    reqwest::{
        StatusCode,
        header::{COOKIE, LOCATION, REFERER},
    },
    secrecy::ExposeSecret,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    Error, Result, page,
    session::Session,
    types::{Credentials, VoteRequest, VoteTable},
};

/// Operations the poll job and manual votes need from the directory.
#[async_trait]
pub trait CompatibilityDirectory: Send + Sync {
    /// Authenticate and cache the session for later calls.
    async fn login(&self, credentials: &Credentials) -> Result<()>;

    /// Votes the logged-in account has cast for `slug`.
    async fn fetch_votes(&self, slug: &str) -> Result<VoteTable>;

    /// Cast a vote through the plugin page's voting form.
    async fn submit_vote(&self, vote: &VoteRequest) -> Result<()>;
}

/// Scraping client for the plugin directory website.
///
/// One instance holds at most one session. When no session is cached, the
/// first authenticated call logs in with the credentials given at
/// construction.
pub struct DirectoryClient {
    config: DirectoryConfig,
    http: reqwest::Client,
    credentials: Option<Credentials>,
    session: Mutex<Option<Session>>,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig, credentials: Option<Credentials>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| Error::network("failed to build HTTP client", source))?;
        Ok(Self {
            config,
            http,
            credentials,
            session: Mutex::new(None),
        })
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Post the login form. Success requires both a `Location` header and at
    /// least one session cookie on the response.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let login_url = parse_url(&self.config.login_url())?;
        debug!(
            url = %login_url,
            username = %credentials.username,
            "logging in to plugin directory"
        );

        let form = [
            ("user_login", credentials.username.as_str()),
            ("password", credentials.password.expose_secret().as_str()),
            ("Submit", "Log In"),
            ("re", ""),
        ];
        let resp = self
            .http
            .post(login_url)
            .header(REFERER, self.config.referer_url())
            .form(&form)
            .send()
            .await
            .map_err(|source| Error::network("login request failed", source))?;

        let has_location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !v.is_empty());
        let session = Session::from_response(&resp);

        if !has_location || session.is_empty() {
            warn!(
                username = %credentials.username,
                status = resp.status().as_u16(),
                "plugin directory login rejected"
            );
            return Err(Error::invalid_credentials());
        }

        info!(
            username = %credentials.username,
            cookies = session.len(),
            "logged in to plugin directory"
        );
        Ok(session)
    }

    /// Return the cached session, logging in with the stored credentials if
    /// there is none.
    async fn ensure_session(&self) -> Result<Session> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            return Ok(session.clone());
        }
        let credentials = self.credentials.as_ref().ok_or_else(Error::not_logged_in)?;
        let session = self.authenticate(credentials).await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    fn plugin_page_url(&self, slug: &str) -> Result<Url> {
        parse_url(&self.config.plugin_page_url(&urlencoding::encode(slug)))
    }

    /// GET the plugin's directory page and return its body.
    async fn fetch_page(&self, slug: &str, session: &Session) -> Result<String> {
        let url = self.plugin_page_url(slug)?;
        debug!(slug, url = %url, "fetching directory page");

        let resp = self
            .http
            .get(url)
            .header(COOKIE, session.cookie_header())
            .send()
            .await
            .map_err(|source| {
                Error::network("failed to fetch the plugin's directory page", source)
            })?;

        match resp.status() {
            StatusCode::OK => resp.text().await.map_err(|source| {
                Error::network("failed to read the plugin's directory page", source)
            }),
            StatusCode::NOT_FOUND => Err(Error::NotInDirectory {
                slug: slug.to_string(),
            }),
            status => Err(Error::FetchFailed {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl CompatibilityDirectory for DirectoryClient {
    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let session = self.authenticate(credentials).await?;
        *self.session.lock().await = Some(session);
        Ok(())
    }

    async fn fetch_votes(&self, slug: &str) -> Result<VoteTable> {
        let session = self.ensure_session().await?;
        let body = self.fetch_page(slug, &session).await?;
        let votes = page::extract_votes(&body)?;
        debug!(slug, votes = votes.len(), "parsed directory votes");
        Ok(votes)
    }

    async fn submit_vote(&self, vote: &VoteRequest) -> Result<()> {
        let session = self.ensure_session().await?;
        let body = self.fetch_page(&vote.slug, &session).await?;

        let mut fields = page::extract_form_fields(&body)?;

        if !vote.allow_overwrite {
            let existing = page::extract_votes(&body)?;
            if existing.contains(&vote.host_version, &vote.plugin_version) {
                debug!(
                    slug = %vote.slug,
                    host_version = %vote.host_version,
                    plugin_version = %vote.plugin_version,
                    "vote already recorded, not overwriting"
                );
                return Err(Error::AlreadyVoted { existing });
            }
        }

        page::set_field(&mut fields, "compatibility[version]", &vote.host_version);
        page::set_field(&mut fields, "compatibility[topic_version]", &vote.plugin_version);
        page::set_field(
            &mut fields,
            "compatibility[compatible]",
            if vote.compatible { "1" } else { "0" },
        );

        let url = self.plugin_page_url(&vote.slug)?;
        let resp = self
            .http
            .post(url)
            .header(COOKIE, session.cookie_header())
            .header(REFERER, self.config.referer_url())
            .form(&fields)
            .send()
            .await
            .map_err(|source| Error::network("vote submission failed", source))?;

        let status = resp.status();
        if status != StatusCode::FOUND {
            warn!(
                slug = %vote.slug,
                status = status.as_u16(),
                "vote not accepted by plugin directory"
            );
            return Err(Error::VotingFailed {
                status: status.as_u16(),
            });
        }

        info!(
            slug = %vote.slug,
            host_version = %vote.host_version,
            plugin_version = %vote.plugin_version,
            compatible = vote.compatible,
            "compatibility vote submitted"
        );
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| Error::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
