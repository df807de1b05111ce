//! geotag — appends the device's current coordinates to filenames.
//!
//! One invocation acquires a single location fix through the best backend
//! for the detected runtime (SL4A bridge on Pydroid 3, termux-location on
//! Termux, IP geolocation elsewhere), formats it as a filename-safe suffix,
//! and renames every untagged regular file in a target directory.

pub mod location;
pub mod renamer;
pub mod tag;
