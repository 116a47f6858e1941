use chrono::{DateTime, Duration, Utc};

/// How long a raised alert stays visible before self-expiring.
pub const ALERT_TTL_SECS: i64 = 5;

/// Visual severity of an alert banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Success,
    Danger,
    Info,
    Warning,
}

/// A single-slot, self-expiring alert banner.
///
/// A newer alert replaces the current one; otherwise it disappears
/// `ALERT_TTL_SECS` after being raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub text: String,
    pub severity: AlertSeverity,
    raised_at: DateTime<Utc>,
}

impl AlertMessage {
    #[must_use]
    pub fn new(text: impl Into<String>, severity: AlertSeverity, raised_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            severity,
            raised_at,
        }
    }

    #[must_use]
    pub fn raised_at(&self) -> DateTime<Utc> {
        self.raised_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.raised_at + Duration::seconds(ALERT_TTL_SECS)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn alert_expires_after_ttl() {
        let raised = fixed_now();
        let alert = AlertMessage::new("Lesson completed!", AlertSeverity::Success, raised);

        assert!(!alert.is_expired(raised));
        assert!(!alert.is_expired(raised + Duration::seconds(ALERT_TTL_SECS - 1)));
        assert!(alert.is_expired(raised + Duration::seconds(ALERT_TTL_SECS)));
    }
}
