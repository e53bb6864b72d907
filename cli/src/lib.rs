mod commands;
mod session;

pub use commands::{CommandParseError, GoOptions, SessionCommand};
pub use session::{Flow, Session};
