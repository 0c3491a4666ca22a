//! Precondition checks for callers that issue commands through the client

use crate::client::MessagingClient;
use crate::identity::{self, Jid, USER_SERVER};
use crate::{Error, Result};

/// Ensure a client exists, is connected, and has a logged-in account
///
/// # Errors
///
/// Returns [`Error::NotInitialized`], [`Error::NotConnected`] or
/// [`Error::NotLoggedIn`]
pub fn ensure_logged_in(client: Option<&dyn MessagingClient>) -> Result<&dyn MessagingClient> {
    let client = client.ok_or(Error::NotInitialized)?;
    if !client.is_connected() {
        return Err(Error::NotConnected);
    }
    if !client.is_logged_in() {
        return Err(Error::NotLoggedIn);
    }
    Ok(client)
}

/// Check login state, optionally confirm the address is registered, then
/// parse it
///
/// Registration is only checked for user addresses; groups and bare numbers
/// are parsed as-is.
///
/// # Errors
///
/// Returns a login error from [`ensure_logged_in`], or
/// [`Error::InvalidJid`] if the address is unregistered or malformed
pub async fn validate_recipient(
    client: Option<&dyn MessagingClient>,
    address: &str,
    account_validation: bool,
) -> Result<Jid> {
    let client = ensure_logged_in(client)?;

    if account_validation && address.contains(&format!("@{USER_SERVER}")) {
        let registered = client
            .is_on_whatsapp(address)
            .await
            .map_err(|e| Error::InvalidJid(e.to_string()))?;
        if !registered {
            return Err(Error::InvalidJid(format!("phone {address} is not on whatsapp")));
        }
    }

    identity::parse_jid(address)
}
