//! User profile details domain module.
//!
//! # Module Structure
//!
//! - `model`: Profile details snapshot and the staged field update

mod model;

pub use model::{PROFILE_FIELDS, ProfileDetails, ProfileUpdate};
