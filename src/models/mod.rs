//! Data models for the GameHub mini-app.
//!
//! These models match the mini-app's JSON shapes (camelCase) so stored values and
//! API payloads can be exchanged with the browser client unchanged.

mod announcement;
mod datastore;
mod game;
mod news;
mod preferences;
mod review;
mod stats;
mod token;

pub use announcement::*;
pub use datastore::*;
pub use game::*;
pub use news::*;
pub use preferences::*;
pub use review::*;
pub use stats::*;
pub use token::*;
