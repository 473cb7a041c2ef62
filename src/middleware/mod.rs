pub mod auth;
pub mod cors;
pub mod security;

pub use auth::{AuthUser, Uploader};
