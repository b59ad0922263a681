pub mod auth;
pub mod health;
pub mod prefs;
pub mod products;
