pub mod auth;
pub mod token;
pub mod totp;

pub use auth::AuthService;
pub use token::TokenService;
pub use totp::TotpService;
