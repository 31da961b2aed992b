//! surf library exports for the binary and tests

pub mod browser;
pub mod core;
pub mod demo;

#[cfg(test)]
pub mod test_support;
