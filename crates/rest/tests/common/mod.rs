//! Common test utilities for API testing.
//!
//! - [`harness`] - a test server over in-memory storage and the demo provider
//! - [`assertions`] - response assertions

#![allow(dead_code)]

pub mod assertions;
pub mod harness;
