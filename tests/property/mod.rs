//! Property-based tests

pub mod timeline_proptest;
pub mod wire_proptest;
