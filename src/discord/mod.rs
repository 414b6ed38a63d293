//! Discord integration: client lifecycle, event handling, and the
//! `/roster` command surface.

pub mod bot;
pub mod commands;
pub mod handler;

pub use bot::run;
pub use handler::RosterEventHandler;
