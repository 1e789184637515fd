pub mod analysis;
pub use analysis::MockAnalyzer;

pub mod input_guard;
pub mod password;
pub mod sanitize;

pub mod token;
pub use token::{AuthUser, TokenError, TokenService};

pub mod achievement_service;
pub mod achievement_service_impl;
pub use achievement_service::{AchievementError, AchievementService};
pub use achievement_service_impl::DefaultAchievementService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, RegisterRequest, Session, UserProfile};
pub use auth_service_impl::DefaultAuthService;
