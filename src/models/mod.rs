pub mod quote;
pub mod user;

pub use quote::Quote;
pub use user::{TwoFactorState, User};
