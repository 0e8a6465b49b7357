//! The `vaultlock` operator binary.

pub mod cli;
