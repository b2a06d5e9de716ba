use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::{Error, Result};

pub const FREE_DEMO_WINDOW: Duration = Duration::from_secs(120);
pub const EXPIRY_MESSAGE: &str =
    "Your Free Demo has expired after 2 minutes. Please upgrade to Paid User for full access.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UserTier {
    FreeDemo,
    Paid,
}

impl UserTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::FreeDemo => "Free Demo (2 mins)",
            Self::Paid => "Paid User",
        }
    }
}

impl fmt::Display for UserTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserTier {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free-demo" | "free_demo" | "free" | "demo" => Ok(Self::FreeDemo),
            "paid" | "paid-user" => Ok(Self::Paid),
            other => Err(Error::Validation(format!(
                "unknown user tier {other:?} (expected free-demo or paid)"
            ))),
        }
    }
}

/// Username plus a wall-clock throttle for the free tier.
///
/// Not a security boundary: there is no credential check.
#[derive(Debug, Clone)]
pub struct AccessGate {
    username: String,
    tier: UserTier,
    started_at: Instant,
}

impl AccessGate {
    pub fn login(username: &str, tier: UserTier) -> Result<Self> {
        Self::login_at(username, tier, Instant::now())
    }

    pub fn login_at(username: &str, tier: UserTier, started_at: Instant) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation(
                "Please enter a username to continue.".to_string(),
            ));
        }
        Ok(Self {
            username: username.to_string(),
            tier,
            started_at,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn tier(&self) -> UserTier {
        self.tier
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn check_at(&self, now: Instant) -> Result<()> {
        match self.tier {
            UserTier::Paid => Ok(()),
            UserTier::FreeDemo if self.elapsed_at(now) > FREE_DEMO_WINDOW => {
                Err(Error::Expired(EXPIRY_MESSAGE.to_string()))
            }
            UserTier::FreeDemo => Ok(()),
        }
    }

    pub fn check(&self) -> Result<()> {
        self.check_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_username_is_rejected() {
        let e = AccessGate::login("  ", UserTier::Paid).unwrap_err();
        assert_eq!(
            e,
            Error::Validation("Please enter a username to continue.".to_string())
        );
    }

    #[test]
    fn free_demo_expires_strictly_after_the_window() {
        let t0 = Instant::now();
        let g = AccessGate::login_at("ada", UserTier::FreeDemo, t0).unwrap();
        assert!(g.check_at(t0 + Duration::from_secs(120)).is_ok());
        assert_eq!(
            g.check_at(t0 + Duration::from_secs(121)),
            Err(Error::Expired(EXPIRY_MESSAGE.to_string()))
        );
    }

    #[test]
    fn paid_tier_never_expires() {
        let t0 = Instant::now();
        let g = AccessGate::login_at("ada", UserTier::Paid, t0).unwrap();
        assert!(g.check_at(t0 + Duration::from_secs(86_400)).is_ok());
        assert_eq!(g.username(), "ada");
    }

    #[test]
    fn tier_parses_cli_spellings() {
        assert_eq!("free-demo".parse::<UserTier>().unwrap(), UserTier::FreeDemo);
        assert_eq!("Paid".parse::<UserTier>().unwrap(), UserTier::Paid);
        assert!("gold".parse::<UserTier>().is_err());
    }
}
