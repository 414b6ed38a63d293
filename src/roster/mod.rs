//! Roster building from introduction messages.
//!
//! This module is the pure core of the bot: keyword-anchored IGN
//! extraction, role-grouped roster rendering, and line-aware
//! pagination. Nothing in here talks to Discord, so all of it is
//! unit-testable in isolation.

pub mod builder;
pub mod matcher;
pub mod paginate;

pub use builder::{build_roster, MemberProfile, RoleInfo};
pub use matcher::extract_ign;
pub use paginate::{split_text_lines, DISCORD_MESSAGE_LIMIT};
