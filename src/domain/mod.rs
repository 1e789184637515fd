//! Domain types for accounts and achievements.
//!
//! Newtype identifiers and the fixed achievement catalog live here, together
//! with the two pure rules the rest of the crate builds on: the login-streak
//! evaluator and the achievement ledger transition.

pub mod ledger;
pub mod streak;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::achievements::{DAILY_LOGIN_TARGET, DETECTION_MASTER_TARGET};

/// Unique identifier for a registered user.
///
/// ```rust
/// use deepguard::domain::UserId;
///
/// let id = UserId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five achievements every user can earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementKind {
    #[serde(alias = "first_login")]
    FirstLogin,
    #[serde(alias = "profile_complete")]
    ProfileComplete,
    #[serde(alias = "detection_master")]
    DetectionMaster,
    #[serde(alias = "daily_login")]
    DailyLogin,
    #[serde(alias = "security_aware")]
    SecurityAware,
}

impl AchievementKind {
    pub const ALL: [Self; 5] = [
        Self::FirstLogin,
        Self::ProfileComplete,
        Self::DetectionMaster,
        Self::DailyLogin,
        Self::SecurityAware,
    ];

    /// Stable string key used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstLogin => "first-login",
            Self::ProfileComplete => "profile-complete",
            Self::DetectionMaster => "detection-master",
            Self::DailyLogin => "daily-login",
            Self::SecurityAware => "security-aware",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::FirstLogin => "First Connection",
            Self::ProfileComplete => "Complete Profile",
            Self::DetectionMaster => "Detection Master",
            Self::DailyLogin => "Frequent Visitor",
            Self::SecurityAware => "Security Aware",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FirstLogin => "Sign in to the platform for the first time",
            Self::ProfileComplete => "Fill in every field of your profile",
            Self::DetectionMaster => "Perform 10 detections with more than 90% confidence",
            Self::DailyLogin => "Sign in on 5 consecutive days",
            Self::SecurityAware => "Change your password for the first time",
        }
    }

    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::FirstLogin => "fas fa-door-open",
            Self::ProfileComplete => "fas fa-user-check",
            Self::DetectionMaster => "fas fa-medal",
            Self::DailyLogin => "fas fa-calendar-check",
            Self::SecurityAware => "fas fa-shield-alt",
        }
    }

    /// Progress at which the achievement completes on its own, if any.
    /// Achievements without a target only complete when forced.
    #[must_use]
    pub const fn target(&self) -> Option<i32> {
        match self {
            Self::DetectionMaster => Some(DETECTION_MASTER_TARGET),
            Self::DailyLogin => Some(DAILY_LOGIN_TARGET),
            Self::FirstLogin | Self::ProfileComplete | Self::SecurityAware => None,
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown achievement: {0}")]
pub struct UnknownAchievement(pub String);

impl FromStr for AchievementKind {
    type Err = UnknownAchievement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownAchievement(s.to_string()))
    }
}
