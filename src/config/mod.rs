//! Configuration for packport.
//!
//! packport has a single, user-wide configuration file holding connection profiles.
//! See [`global`] for its location, format and the profile resolution order.

pub mod global;

pub use global::{GlobalConfig, Profile};
