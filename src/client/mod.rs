//! Command interface of the messaging client
//!
//! The protocol client owns the connection, the session and the device
//! store. The bridge only issues the handful of commands below and reads
//! the identity of the logged-in account.

mod replay;

use async_trait::async_trait;

pub use replay::ReplayClient;

use crate::events::MediaReference;
use crate::Result;

/// Commands the bridge issues back to the messaging client
///
/// Implementations must be safe to call from several event handlers at once.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Address of the logged-in account, if any
    fn own_id(&self) -> Option<String>;

    /// Display name of the logged-in account, if known
    fn push_name(&self) -> Option<String>;

    /// Whether the client holds an open connection
    fn is_connected(&self) -> bool;

    /// Whether the client has a paired, logged-in account
    fn is_logged_in(&self) -> bool;

    /// Announce the account as available
    async fn send_presence_available(&self) -> Result<()>;

    /// Send a plain text message
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Download and decrypt the bytes behind a media reference
    async fn download(&self, media: &MediaReference) -> Result<Vec<u8>>;

    /// Check whether an address is registered on the network
    ///
    /// Default implementation assumes every address is registered
    async fn is_on_whatsapp(&self, _jid: &str) -> Result<bool> {
        Ok(true)
    }
}
