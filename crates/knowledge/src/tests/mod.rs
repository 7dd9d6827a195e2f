//! Cross-module scenario tests.

mod support;
