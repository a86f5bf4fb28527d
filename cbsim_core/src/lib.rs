//! Core rust implementation of cbsim, a crate for constraint based metabolic simulation.
//!
//! Provides the metabolic model representation, model readers (SBML, BioOpt and plaintext),
//! an optimization problem abstraction with solver backends, and the flux analysis methods
//! (FBA, pFBA, MOMA, lMOMA, ROOM) together with gene/reaction deletions.

pub mod configuration;
pub mod flux_analysis;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
mod utils;

pub use configuration::CONFIGURATION;
