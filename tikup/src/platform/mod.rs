//! Platform definitions.
//!
//! A platform describes how a vendor's CLI looks over an SSH shell: its
//! prompt, login-time dialogs, error phrases and terminal requirements.

mod definition;
pub mod vendors;

pub use definition::{LoginDialog, PlatformDefinition};
