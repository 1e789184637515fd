pub mod achievement;
pub mod user;

pub use achievement::{AchievementDefinition, ProgressRecord, UserAchievement};
pub use user::{NewUser, User};
