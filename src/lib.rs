// Crate root library declaration and module exports.
pub mod cli;
pub mod config;
pub mod context;
pub mod edit;
pub mod model;
