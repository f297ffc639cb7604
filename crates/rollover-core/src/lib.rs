pub mod error;
pub mod config;
pub mod cookie;
pub mod session;
pub mod service;

pub use cookie::{Cookie, CookieOptions, SameSite};
pub use error::{Result, RolloverError};
pub use session::{ManagedSession, Session, SessionStorage};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
