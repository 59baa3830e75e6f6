pub mod credentials;
pub mod error;
pub mod likes;
pub mod posts;
pub mod users;
