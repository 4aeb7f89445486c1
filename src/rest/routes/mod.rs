pub mod achievements;
pub mod auth;
pub mod health;
pub mod sessions;
pub mod streaks;
pub mod tasks;
pub mod users;
