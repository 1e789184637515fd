pub mod prelude;

pub mod achievements;
pub mod user_achievements;
pub mod users;
