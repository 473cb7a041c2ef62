pub mod jwt;
pub mod password;
pub mod text;

pub use jwt::{decode_session_token, encode_session_token};
pub use password::{hash_key, verify_key};
