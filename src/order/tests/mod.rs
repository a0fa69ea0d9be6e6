//! Unit tests for the order payment lifecycle.

mod service_tests;
mod support;
