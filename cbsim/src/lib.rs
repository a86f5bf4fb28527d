//! Command line front end of cbsim_core
pub mod cli;
pub mod output;
pub mod run;

pub use cli::Cli;
pub use run::{execute, run};
