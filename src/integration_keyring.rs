//! Keyring helpers for remote service credentials.

use keyring::Entry;

const ACCOUNT_NAME: &str = "default";

/// Secret kinds stored in the system keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Twitch application client secret, exchanged for IGDB access tokens.
    TwitchClientSecret,
    /// Google OAuth access token with Drive and Sheets scopes.
    GoogleAccessToken,
}

impl CredentialKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "twitch" => Some(Self::TwitchClientSecret),
            "google" => Some(Self::GoogleAccessToken),
            _ => None,
        }
    }

    fn service_name(self) -> &'static str {
        match self {
            Self::TwitchClientSecret => "game_lookup.twitch",
            Self::GoogleAccessToken => "game_lookup.google",
        }
    }
}

fn credential_entry(kind: CredentialKind) -> Result<Entry, String> {
    Entry::new(kind.service_name(), ACCOUNT_NAME)
        .map_err(|err| format!("failed to create keyring entry for {}: {err}", kind.service_name()))
}

fn keyring_error_hint(error: &str) -> Option<&'static str> {
    if error.contains("org.freedesktop.DBus.Error.ServiceUnknown") {
        return Some("no Secret Service provider is available. Start GNOME Keyring or KeePassXC Secret Service.");
    }
    None
}

fn format_keyring_error(operation: &str, kind: CredentialKind, error: &str) -> String {
    let base = format!(
        "{operation} failed in system keyring for {}: {error}",
        kind.service_name()
    );
    match keyring_error_hint(error) {
        Some(hint) => format!("{base}. Hint: {hint}"),
        None => base,
    }
}

/// Saves a secret into the OS keyring.
pub fn set_credential(kind: CredentialKind, secret: &str) -> Result<(), String> {
    let entry = credential_entry(kind)?;
    entry
        .set_password(secret)
        .map_err(|err| format_keyring_error("save credential", kind, &err.to_string()))
}

/// Loads a secret from the OS keyring, `Ok(None)` when none is stored.
pub fn get_credential(kind: CredentialKind) -> Result<Option<String>, String> {
    let entry = credential_entry(kind)?;
    match entry.get_password() {
        Ok(secret) => Ok(Some(secret)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(format_keyring_error("load credential", kind, &err.to_string())),
    }
}

/// Deletes a stored secret; deleting a missing entry succeeds.
pub fn delete_credential(kind: CredentialKind) -> Result<(), String> {
    let entry = credential_entry(kind)?;
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(format_keyring_error("delete credential", kind, &err.to_string())),
    }
}
