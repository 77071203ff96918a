//! Twitch app-token exchange used to authenticate IGDB requests.

use std::time::Duration;

use log::info;
use serde_json::Value;

pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Requests an app access token with the client-credentials grant.
pub fn fetch_app_access_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, String> {
    let http_client = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(10))
        .build();
    info!("Requesting Twitch app access token");
    let response = http_client
        .post(token_url)
        .send_form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ])
        .map_err(|err| format!("Twitch token request failed: {err}"))?;
    let parsed: Value = response
        .into_json()
        .map_err(|err| format!("Twitch token response parse failed: {err}"))?;
    access_token_from_response(&parsed)
}

fn access_token_from_response(parsed: &Value) -> Result<String, String> {
    match parsed.get("access_token").and_then(Value::as_str) {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => {
            let message = parsed
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no access_token in response");
            Err(format!("Twitch token request rejected: {message}"))
        }
    }
}
