//! Integration test crate for the resource exchange ledger.
//!
//! This crate exists solely to run scenario tests that span `rex-core` and
//! `rex-ledger`. It has no public API - all functionality is in the test modules.

#![forbid(unsafe_code)]
