//! Integration tests for Follow-Ripple
//!
//! These tests use wiremock to stand in for the remote API and run real
//! driver iterations against a temporary SQLite database.

mod traversal_tests;
