//! Integration test suite for packport
//!
//! End-to-end tests of the export and import pipelines against the in-memory
//! `MockPlatform`, plus CLI tests of the compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: binary invocation, argument validation, exit codes, profiles
//! - **export**: dependency closure, filtering, variables and studio data in archives
//! - **import**: space resolution, overwrite checks, ordering, reports
//! - **migration**: export from one environment and import into another

mod cli;
mod export;
mod import;
mod migration;
