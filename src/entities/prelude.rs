pub use super::achievements::Entity as Achievements;
pub use super::user_achievements::Entity as UserAchievements;
pub use super::users::Entity as Users;
