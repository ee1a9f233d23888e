//! Built-in vendor platforms.

pub mod mikrotik_routeros;
