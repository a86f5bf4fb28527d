//! Module for reading Models
//!
//! The reader is chosen from the file name, see [`ModelFormat::from_path`].
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use log::info;
use thiserror::Error;

use crate::metabolic_model::model::Model;

pub mod bioopt;
pub mod equation;
pub mod gpr_parse;
pub mod plaintext;
pub mod reference;
pub mod sbml;

/// Model file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Sbml,
    BioOpt,
    Plaintext,
}

impl ModelFormat {
    /// Guess the format of a model file from its name
    ///
    /// Names ending in `.xml` or `.sbml` are SBML, names ending in `.bioopt` or containing
    /// `bioopt` are BioOpt, anything else is plaintext. Matching ignores case.
    ///
    /// # Examples
    /// ```rust
    /// use cbsim_core::io::ModelFormat;
    /// assert_eq!(ModelFormat::from_path("iJO1366.XML"), ModelFormat::Sbml);
    /// assert_eq!(ModelFormat::from_path("models/yeast_bioopt.txt"), ModelFormat::BioOpt);
    /// assert_eq!(ModelFormat::from_path("core.txt"), ModelFormat::Plaintext);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> ModelFormat {
        let name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".xml") || name.ends_with(".sbml") {
            ModelFormat::Sbml
        } else if name.ends_with(".bioopt") || name.contains("bioopt") {
            ModelFormat::BioOpt
        } else {
            ModelFormat::Plaintext
        }
    }
}

impl Display for ModelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFormat::Sbml => write!(f, "sbml"),
            ModelFormat::BioOpt => write!(f, "bioopt"),
            ModelFormat::Plaintext => write!(f, "plaintext"),
        }
    }
}

impl FromStr for ModelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sbml" | "xml" => Ok(ModelFormat::Sbml),
            "bioopt" => Ok(ModelFormat::BioOpt),
            "plaintext" | "text" | "txt" => Ok(ModelFormat::Plaintext),
            other => Err(format!("unknown model format `{other}`")),
        }
    }
}

/// Read a model, choosing the reader from the file name
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<Model, IoError> {
    let format = ModelFormat::from_path(&path);
    read_model_with_format(path, format)
}

/// Read a model with the given reader
pub fn read_model_with_format<P: AsRef<Path>>(
    path: P,
    format: ModelFormat,
) -> Result<Model, IoError> {
    let path = path.as_ref();
    info!("Reading {} model from {}", format, path.display());
    let model = match format {
        ModelFormat::Sbml => Model::read_sbml(path)?,
        ModelFormat::BioOpt => Model::read_bioopt(path)?,
        ModelFormat::Plaintext => Model::read_plaintext(path)?,
    };
    info!(
        "Model has {} reactions, {} metabolites and {} genes",
        model.reactions.len(),
        model.metabolites.len(),
        model.genes.len()
    );
    Ok(model)
}

/// Errors raised while reading a model
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Unable to read SBML model: {0}")]
    Sbml(#[from] sbml::SbmlError),
    #[error("Unable to read BioOpt model: {0}")]
    BioOpt(#[from] bioopt::BioOptError),
    #[error("Unable to read plaintext model: {0}")]
    Plaintext(#[from] plaintext::PlaintextError),
}
