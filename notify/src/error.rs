//! Delivery failures.

use std::fmt;
use thiserror::Error;

/// Broad cause of a failed delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// Could not reach or negotiate with the server
    Connection,
    /// Server rejected the credentials
    Auth,
    /// Connection dropped or timed out mid-conversation
    Socket,
    /// Anything else
    Unknown,
}

impl DeliveryErrorKind {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Auth => "auth",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed verify or send attempt on one port.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct DeliveryError {
    /// Failure category
    pub kind: DeliveryErrorKind,
    /// Underlying error text
    pub message: String,
}

impl DeliveryError {
    /// Build an error of the given kind.
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`DeliveryErrorKind::Connection`] error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Connection, message)
    }

    /// Shorthand for a [`DeliveryErrorKind::Auth`] error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Auth, message)
    }

    /// Shorthand for a [`DeliveryErrorKind::Socket`] error.
    pub fn socket(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Socket, message)
    }

    /// Shorthand for a [`DeliveryErrorKind::Unknown`] error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Unknown, message)
    }
}

/// What is known about a transport failure, independent of the SMTP library.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailureSignals<'a> {
    /// SMTP reply code, if the server answered
    pub code: Option<u16>,
    /// The attempt hit its timeout
    pub timed_out: bool,
    /// TLS negotiation failed
    pub tls: bool,
    /// Error text
    pub text: &'a str,
}

/// Categorise a transport failure.
///
/// Reply codes 530, 534 and 535 and any mention of authentication are auth
/// failures; timeouts and dropped connections are socket failures; TLS,
/// DNS and refused connections are connection failures.
#[must_use]
pub fn classify(signals: FailureSignals<'_>) -> DeliveryErrorKind {
    let text = signals.text.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

    if matches!(signals.code, Some(530 | 534 | 535)) || mentions(&["authentication", "auth", "credentials"]) {
        DeliveryErrorKind::Auth
    } else if signals.timed_out || mentions(&["timed out", "timeout", "broken pipe", "reset by peer", "socket"]) {
        DeliveryErrorKind::Socket
    } else if signals.tls || mentions(&["connection", "refused", "resolve", "dns", "unreachable", "tls"]) {
        DeliveryErrorKind::Connection
    } else {
        DeliveryErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> FailureSignals<'_> {
        FailureSignals { text, ..FailureSignals::default() }
    }

    #[test]
    fn auth_by_code_or_text() {
        let signals = FailureSignals { code: Some(535), ..text("5.7.8 rejected") };
        assert_eq!(classify(signals), DeliveryErrorKind::Auth);
        assert_eq!(classify(text("Authentication failed")), DeliveryErrorKind::Auth);
    }

    #[test]
    fn socket_and_connection() {
        let timed_out = FailureSignals { timed_out: true, ..text("") };
        assert_eq!(classify(timed_out), DeliveryErrorKind::Socket);
        assert_eq!(classify(text("Connection reset by peer")), DeliveryErrorKind::Socket);
        assert_eq!(classify(text("Connection refused (os error 111)")), DeliveryErrorKind::Connection);
        assert_eq!(classify(text("failed to lookup address: could not resolve")), DeliveryErrorKind::Connection);
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(classify(text("mailbox full")), DeliveryErrorKind::Unknown);
    }
}
