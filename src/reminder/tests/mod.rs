//! Unit tests for reminder scheduling.
