//! Identities, credentials, and the session manager that owns them.

pub mod id;
pub mod session;
pub mod token;

pub use id::*;
pub use session::*;
pub use token::*;
