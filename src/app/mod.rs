pub mod error;
pub mod session;

pub use error::{Result, WarblerError};
pub use session::Session;
