//! # Taskpanel Testing Utils
//!
//! Shared testing utilities for the task panel workspace.
//!
//! ## Features
//!
//! - **Fake control plane**: scripted workers answering broadcast and targeted
//!   requests, recording every call with its scope
//! - **Fake broker**: list-backed, declarative or unsupported transports that
//!   record the keys and queues they were asked about
//! - **In-memory stores**: task-result and schedule stores backed by vectors
//! - **Test data builders**: records with sensible defaults
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! taskpanel-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
