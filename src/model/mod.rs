pub mod duplicate;
pub mod profile;
pub mod user;
