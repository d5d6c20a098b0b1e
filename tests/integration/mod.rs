//! Integration tests against the real router

pub mod handshake_test;
pub mod history_test;
pub mod socket_test;
