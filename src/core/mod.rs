//! Core data structures for hourly profiles.

mod profile;
mod table;

pub use profile::{ProfileName, Series, PROFILE_SEPARATOR};
pub use table::{ProfileRow, ProfileTable};
