//! Last.fm web API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::LastFmConfig;
use crate::error::{Error, Result};

use super::{NowPlaying, Scrobble, ScrobbleService};

/// Timeout for a single API request
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Last.fm 2.0 API
pub struct LastFmClient {
    api_url: String,
    api_key: String,
    api_secret: String,
    session_key: Option<String>,
    http: Client,
}

impl LastFmClient {
    /// Create an unauthenticated client (enough for the auth handshake)
    pub fn new(api_url: &str, api_key: &str, api_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            session_key: None,
            http,
        })
    }

    /// Create an authenticated client from configuration
    pub fn from_config(config: &LastFmConfig, session_key: String) -> Result<Self> {
        Ok(Self::new(&config.api_url, &config.api_key, &config.api_secret)?
            .with_session_key(session_key))
    }

    #[must_use]
    pub fn with_session_key(mut self, session_key: String) -> Self {
        self.session_key = Some(session_key);
        self
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Build the signed form for an API call.
    ///
    /// `api_key`, `method` and (when `authenticated`) `sk` are added and
    /// signed together with `params`; `format` is appended unsigned.
    fn signed_form(
        &self,
        method: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Vec<(String, String)>> {
        let mut form: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        form.push(("method".to_string(), method.to_string()));
        form.push(("api_key".to_string(), self.api_key.clone()));

        if authenticated {
            let sk = self
                .session_key
                .as_ref()
                .ok_or_else(|| Error::config("Last.fm session key missing"))?;
            form.push(("sk".to_string(), sk.clone()));
        }

        let api_sig = sign_params(&form, &self.api_secret);
        form.push(("api_sig".to_string(), api_sig));
        form.push(("format".to_string(), "json".to_string()));
        Ok(form)
    }

    /// Perform a signed POST call and return the decoded JSON body
    pub(crate) async fn call(
        &self,
        method: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value> {
        let form = self.signed_form(method, params, authenticated)?;

        debug!("Last.fm call: {}", method);
        let json: Value = self
            .http
            .post(&self.api_url)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        check_api_error(&json)?;
        Ok(json)
    }
}

#[async_trait]
impl ScrobbleService for LastFmClient {
    async fn update_now_playing(&self, track: &NowPlaying) -> Result<()> {
        let mut params = vec![("artist", track.artist.as_str()), ("track", track.title.as_str())];
        if !track.album.is_empty() {
            params.push(("album", track.album.as_str()));
        }

        self.call("track.updateNowPlaying", &params, true).await?;
        debug!("Last.fm: Now playing updated");
        Ok(())
    }

    async fn scrobble(&self, scrobble: &Scrobble) -> Result<()> {
        let timestamp = scrobble.timestamp.to_string();
        let mut params = vec![
            ("artist", scrobble.artist.as_str()),
            ("track", scrobble.title.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        if !scrobble.album.is_empty() {
            params.push(("album", scrobble.album.as_str()));
        }

        let json = self.call("track.scrobble", &params, true).await?;
        check_scrobble_result(&json)?;
        info!("Last.fm: Scrobbled successfully");
        Ok(())
    }
}

/// Compute `api_sig`: md5 of all `keyvalue` pairs sorted by key, followed by
/// the shared secret.
fn sign_params(params: &[(String, String)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut signature = String::new();
    for (key, value) in sorted {
        signature.push_str(&key);
        signature.push_str(&value);
    }
    signature.push_str(secret);
    format!("{:x}", md5::compute(signature))
}

fn check_api_error(json: &Value) -> Result<()> {
    let Some(error) = json.get("error") else {
        return Ok(());
    };

    let code = error
        .as_i64()
        .or_else(|| error.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or_default();
    let message = json
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("API error")
        .to_string();

    Err(Error::Api { code, message })
}

fn as_count(value: Option<&Value>) -> i64 {
    value
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or_default()
}

/// Last.fm answers 200 even when it drops a scrobble; the drop is reported
/// in `scrobbles.@attr.ignored`.
fn check_scrobble_result(json: &Value) -> Result<()> {
    let Some(scrobbles) = json.get("scrobbles") else {
        return Ok(());
    };

    let ignored = as_count(scrobbles.get("@attr").and_then(|attr| attr.get("ignored")));
    if ignored == 0 {
        return Ok(());
    }

    let ignored_message = scrobbles
        .get("scrobble")
        .map(|s| s.as_array().and_then(|a| a.first()).unwrap_or(s))
        .and_then(|s| s.get("ignoredMessage"));
    let code = as_count(ignored_message.and_then(|m| m.get("code")));
    let message = ignored_message
        .and_then(|m| m.get("#text"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("scrobble ignored")
        .to_string();

    Err(Error::Api { code, message })
}
