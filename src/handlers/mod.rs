pub mod authentication;
pub mod health;
pub mod quotes;
pub mod two_factor;

pub use authentication::{current_user, log_in, register};
pub use health::health_check;
