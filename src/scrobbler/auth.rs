//! One-time Last.fm web authorization
//!
//! Requests a token, asks the user to approve it in a browser and then polls
//! `auth.getSession` until Last.fm hands out a session key. Session keys do
//! not expire, so this only has to run once.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::LastFmClient;

/// Page where the user approves a token
pub const AUTH_URL: &str = "https://www.last.fm/api/auth/";

/// Delay between `auth.getSession` attempts
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Token has not been authorized yet
const ERROR_UNAUTHORIZED_TOKEN: i64 = 14;

/// Build the approval URL for a token
#[must_use]
pub fn authorization_url(api_key: &str, token: &str) -> String {
    format!(
        "{AUTH_URL}?api_key={}&token={}",
        urlencoding::encode(api_key),
        urlencoding::encode(token)
    )
}

fn string_field<'a>(json: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(json, |value, key| value.get(key))
        .and_then(Value::as_str)
}

/// Print `url` and try to open it with `open_url`; returns whether a browser
/// was launched.
fn show_authorization_url<F>(url: &str, open_url: F) -> bool
where
    F: FnOnce(&str) -> std::io::Result<()>,
{
    println!("Please authorize this application to access your Last.fm account:\n\n  {url}\n");
    match open_url(url) {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not open a browser: {}", e);
            println!("Open the link above in your browser to continue.");
            false
        }
    }
}

/// Run the web authorization flow and return the session key.
///
/// Blocks until the user approves the request. Any API error other than
/// "token not yet authorized" (an expired token included) aborts the flow.
pub async fn authorize(client: &LastFmClient) -> Result<String> {
    let json = client.call("auth.getToken", &[], false).await?;
    let token = string_field(&json, &["token"])
        .ok_or_else(|| Error::other("auth.getToken response has no token"))?
        .to_string();

    let url = authorization_url(client.api_key(), &token);
    if show_authorization_url(&url, |url| open::that_detached(url)) {
        info!("Opened the authorization page in your browser");
    }
    info!("Waiting for authorization...");

    loop {
        match client
            .call("auth.getSession", &[("token", token.as_str())], false)
            .await
        {
            Ok(json) => {
                let key = string_field(&json, &["session", "key"])
                    .ok_or_else(|| Error::other("auth.getSession response has no session key"))?;
                if let Some(name) = string_field(&json, &["session", "name"]) {
                    info!("Authorized as {}", name);
                }
                return Ok(key.to_string());
            }
            Err(e) if e.api_code() == Some(ERROR_UNAUTHORIZED_TOKEN) => {
                debug!("Token not authorized yet");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    }
}
