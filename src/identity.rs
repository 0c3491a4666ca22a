//! Address helpers and loop filters
//!
//! Addresses look like `6281234567890@s.whatsapp.net` (users),
//! `120363025246125486@g.us` (groups) or `status@broadcast`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Server suffix for user addresses
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server suffix for group addresses
pub const GROUP_SERVER: &str = "g.us";

/// Longest bare phone number; anything longer is treated as a group id
const MAX_PHONE_LEN: usize = 15;

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Whether the address denotes a group chat
#[must_use]
pub fn is_group(address: &str) -> bool {
    address.contains(&format!("@{GROUP_SERVER}"))
}

/// Whether the source string belongs to a broadcast list or status update
#[must_use]
pub fn is_broadcast(source: &str) -> bool {
    source.contains("broadcast")
}

/// First run of digits in the address, or an empty string
#[must_use]
pub fn extract_phone_number(address: &str) -> &str {
    DIGITS_REGEX.find(address).map_or("", |m| m.as_str())
}

/// Whether `address` belongs to the logged-in account `own_id`
///
/// Only the leading digit runs are compared, so device suffixes and servers
/// are ignored. Returns false when the own id is unknown.
#[must_use]
pub fn is_self(address: &str, own_id: Option<&str>) -> bool {
    own_id.is_some_and(|own| extract_phone_number(address) == extract_phone_number(own))
}

/// Append the default server to a bare phone number or group id
#[must_use]
pub fn sanitize_phone(phone: &str) -> String {
    if phone.is_empty() || phone.contains('@') {
        return phone.to_string();
    }
    if phone.len() <= MAX_PHONE_LEN {
        format!("{phone}@{USER_SERVER}")
    } else {
        format!("{phone}@{GROUP_SERVER}")
    }
}

/// Parsed address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jid {
    pub user: String,
    pub device: Option<u16>,
    pub server: String,
}

impl Jid {
    /// Address on the default user server
    #[must_use]
    pub fn user(user: &str) -> Self {
        Self {
            user: user.to_string(),
            device: None,
            server: USER_SERVER.to_string(),
        }
    }

    /// Whether this address is a group
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            Some(device) => write!(f, "{}:{device}@{}", self.user, self.server),
            None => write!(f, "{}@{}", self.user, self.server),
        }
    }
}

/// Parse an address, accepting bare phone numbers with an optional `+`
///
/// # Errors
///
/// Returns [`Error::InvalidJid`] if the address has no user part or a
/// malformed device suffix
pub fn parse_jid(raw: &str) -> Result<Jid> {
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    if raw.is_empty() {
        return Err(Error::InvalidJid("empty address".to_string()));
    }

    let Some((user_part, server)) = raw.split_once('@') else {
        return Ok(Jid::user(raw));
    };

    let (user, device) = match user_part.split_once(':') {
        Some((user, device)) => {
            let device = device
                .parse::<u16>()
                .map_err(|_| Error::InvalidJid(format!("{raw}: bad device suffix")))?;
            (user, Some(device))
        }
        None => (user_part, None),
    };

    if user.is_empty() {
        return Err(Error::InvalidJid(format!("{raw}: no user specified")));
    }
    if server.is_empty() {
        return Err(Error::InvalidJid(format!("{raw}: no server specified")));
    }

    Ok(Jid {
        user: user.to_string(),
        device,
        server: server.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_group() {
        assert!(is_group("120363025246125486@g.us"));
        assert!(!is_group("6281234567890@s.whatsapp.net"));
        assert!(!is_group("status@broadcast"));
    }

    #[test]
    fn test_is_broadcast() {
        assert!(is_broadcast("6281234567890@s.whatsapp.net in status@broadcast"));
        assert!(!is_broadcast("6281234567890@s.whatsapp.net"));
    }

    #[test]
    fn test_extract_phone_number() {
        assert_eq!(extract_phone_number("6281234567890@s.whatsapp.net"), "6281234567890");
        assert_eq!(extract_phone_number("6281234567890:12@s.whatsapp.net"), "6281234567890");
        assert_eq!(extract_phone_number("+6281234567890@g.us"), "6281234567890");
        assert_eq!(extract_phone_number("status@broadcast"), "");
    }

    #[test]
    fn test_is_self_ignores_suffix() {
        let own = Some("6281234567890:3@s.whatsapp.net");
        assert!(is_self("6281234567890@s.whatsapp.net", own));
        assert!(is_self("+6281234567890@g.us", own));
        assert_eq!(
            is_self("6281234567890@s.whatsapp.net", own),
            is_self("+6281234567890@g.us", own)
        );
        assert!(!is_self("6289999999999@s.whatsapp.net", own));
    }

    #[test]
    fn test_is_self_unknown_own_id() {
        assert!(!is_self("6281234567890@s.whatsapp.net", None));
    }

    #[test]
    fn test_sanitize_phone() {
        assert_eq!(sanitize_phone("6281234567890"), "6281234567890@s.whatsapp.net");
        assert_eq!(sanitize_phone("120363025246125486"), "120363025246125486@g.us");
        assert_eq!(sanitize_phone("628123@s.whatsapp.net"), "628123@s.whatsapp.net");
        assert_eq!(sanitize_phone(""), "");
    }

    #[test]
    fn test_parse_jid() {
        let jid = parse_jid("+6281234567890").unwrap();
        assert_eq!(jid, Jid::user("6281234567890"));
        assert_eq!(jid.to_string(), "6281234567890@s.whatsapp.net");

        let jid = parse_jid("6281234567890:7@s.whatsapp.net").unwrap();
        assert_eq!(jid.device, Some(7));
        assert_eq!(jid.to_string(), "6281234567890:7@s.whatsapp.net");

        let jid = parse_jid("120363025246125486@g.us").unwrap();
        assert!(jid.is_group());
    }

    #[test]
    fn test_parse_jid_rejects_missing_user() {
        assert!(matches!(parse_jid("@s.whatsapp.net"), Err(Error::InvalidJid(_))));
        assert!(matches!(parse_jid(""), Err(Error::InvalidJid(_))));
        assert!(matches!(parse_jid("628:x@s.whatsapp.net"), Err(Error::InvalidJid(_))));
    }
}
