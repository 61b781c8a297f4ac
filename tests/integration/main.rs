//! Integration tests
//!
//! `catalog_tests` and `router_tests` run against the in-memory store.
//! `api_tests` needs a running server and is ignored by default.

mod catalog_tests;
mod common;
mod router_tests;
