pub mod admin;
pub mod auth;
pub mod cache;
pub mod campus;
pub mod contribution;
pub mod course;
pub mod identity;
pub mod keepalive;
pub mod notice;
pub mod question;
pub mod upload;
