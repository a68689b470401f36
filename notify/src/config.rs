//! Mailer configuration.
//!
//! Built once at startup and shared read-only by every worker.

use std::time::Duration;

/// Ports tried after the configured one, in order.
pub const FALLBACK_PORTS: [u16; 3] = [587, 465, 25];

/// SMTP and dispatch settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailerConfig {
    /// SMTP host
    pub host: String,
    /// Preferred SMTP port
    pub port: u16,
    /// SMTP username
    pub username: Option<String>,
    /// SMTP password
    pub password: Option<String>,
    /// Sender address; falls back to the username
    pub from_address: Option<String>,
    /// Sender display name
    pub from_name: String,
    /// Bound on a single verify or send attempt
    pub timeout: Duration,
    /// Log emails instead of sending them
    pub dev_mode: bool,
    /// Number of delivery workers
    pub workers: usize,
    /// Jobs that may wait for a worker
    pub queue_capacity: usize,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Alumni Reunion Committee".to_string(),
            timeout: Duration::from_secs(10),
            dev_mode: false,
            workers: 2,
            queue_capacity: 256,
        }
    }
}

impl MailerConfig {
    /// Configured port first, then the fallbacks, without repeats.
    #[must_use]
    pub fn candidate_ports(&self) -> Vec<u16> {
        let mut ports = Vec::with_capacity(FALLBACK_PORTS.len() + 1);
        for port in std::iter::once(self.port).chain(FALLBACK_PORTS) {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }

    /// Whether both username and password are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        let set = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        set(&self.username) && set(&self.password)
    }

    /// Sender address, if one can be determined.
    #[must_use]
    pub fn sender_address(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.username.as_deref())
            .filter(|address| !address.is_empty())
    }
}
