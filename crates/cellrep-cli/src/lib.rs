//! Command-line front end for attaching V(D)J contigs to cells.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
