// Library exports for testing
// Allow dead_code for library targets - functions are used by the binary but not by tests
#![allow(dead_code)]

pub mod cli;
pub mod config;
pub mod proxy;
