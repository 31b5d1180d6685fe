use serde::{Deserialize, Serialize};

/// Which deployment of the remote service a client targets.
///
/// The legacy configuration surface encodes this as a one-character flag:
/// `"2"` selects staging, anything else selects production. [`from_flag`]
/// keeps that contract so existing configuration keeps working.
///
/// [`from_flag`]: Environment::from_flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Production,
    Staging,
}

impl Environment {
    #[must_use]
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim() == "2" {
            Self::Staging
        } else {
            Self::Production
        }
    }

    #[must_use]
    pub const fn is_staging(self) -> bool {
        matches!(self, Self::Staging)
    }
}
