//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod archives;
pub mod stub_server;
