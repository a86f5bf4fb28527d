//! Module providing SBML IO for Models
//!
//! Supports SBML level 2 and 3 with the FBC package (version 1 flux bounds, version 2
//! parameter bounds and gene product associations), along with the older COBRA
//! conventions of kinetic law parameters and `GENE_ASSOCIATION:` notes.
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::configuration;
use crate::io::gpr_parse::{parse_optional_gpr, GprParseError};
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{Gpr, GprError, GprOperatorType, Model};
use crate::metabolic_model::reaction::Reaction;

const GENE_ASSOCIATION_PREFIXES: [&str; 2] = ["GENE_ASSOCIATION:", "GENE ASSOCIATION:"];
const SUBSYSTEM_PREFIX: &str = "SUBSYSTEM:";

impl Model {
    /// Read an SBML model file
    pub fn read_sbml<P: AsRef<Path>>(path: P) -> Result<Model, SbmlError> {
        let source = fs::read_to_string(path)?;
        Model::from_sbml(&source)
    }

    /// Build a model from an SBML document
    pub fn from_sbml(source: &str) -> Result<Model, SbmlError> {
        let mut parser = SbmlParser::default();
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    parser.open(&name, &e)?;
                    parser.stack.push(name);
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    parser.open(&name, &e)?;
                    parser.close(&name)?;
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    parser.stack.pop();
                    parser.close(&name)?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(xml_error)?;
                    parser.text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        parser.finish()
    }
}

/// Reaction as read from the document, before parameters are resolved
#[derive(Default)]
struct PendingReaction {
    id: String,
    name: Option<String>,
    reversible: Option<bool>,
    lower_parameter: Option<String>,
    upper_parameter: Option<String>,
    kinetic_parameters: IndexMap<String, f64>,
    /// Species and coefficient, substrates negative
    species: Vec<(String, f64)>,
    gpr: Option<Gpr>,
    gpr_note: Option<String>,
    subsystem: Option<String>,
}

#[derive(Clone, Copy)]
enum GprFrameKind {
    Root,
    And,
    Or,
}

struct GprFrame {
    kind: GprFrameKind,
    children: Vec<Gpr>,
}

impl GprFrame {
    fn new(kind: GprFrameKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Combine the children into one left associative tree
    fn fold(self) -> Result<Option<Gpr>, GprError> {
        let operator = match self.kind {
            GprFrameKind::And => GprOperatorType::And,
            // Several children directly under the association aren't valid FBC, treat them as
            // isozymes
            GprFrameKind::Or | GprFrameKind::Root => GprOperatorType::Or,
        };
        let mut children = self.children.into_iter();
        let Some(first) = children.next() else {
            return Ok(None);
        };
        children
            .try_fold(first, |acc, child| {
                Gpr::new_binary_operation(acc, operator, child)
            })
            .map(Some)
    }
}

#[derive(Default)]
struct SbmlParser {
    /// Open elements, by local name
    stack: Vec<String>,
    seen_model: bool,
    model_id: Option<String>,
    model_name: Option<String>,
    compartments: IndexMap<String, String>,
    species: IndexMap<String, Metabolite>,
    parameters: HashMap<String, f64>,
    reactions: Vec<PendingReaction>,
    current: Option<PendingReaction>,
    /// Reactant or product list currently open, with its sign
    species_sign: Option<f64>,
    gpr_frames: Vec<GprFrame>,
    gene_products: IndexMap<String, Gene>,
    /// FBC version 1 bounds, reaction id to (operation, value)
    flux_bounds: IndexMap<String, Vec<(String, f64)>>,
    active_objective: Option<String>,
    current_objective: Option<String>,
    objectives: IndexMap<String, Vec<(String, f64)>>,
}

impl SbmlParser {
    fn in_element(&self, name: &str) -> bool {
        self.stack.iter().any(|open| open == name)
    }

    fn open(&mut self, name: &str, element: &BytesStart) -> Result<(), SbmlError> {
        match name {
            "model" => {
                self.seen_model = true;
                let attrs = attributes(element)?;
                self.model_id = attrs.get("id").cloned();
                self.model_name = attrs.get("name").cloned();
            }
            "compartment" => {
                let attrs = attributes(element)?;
                if let Some(id) = attrs.get("id") {
                    let name = attrs.get("name").unwrap_or(id).clone();
                    self.compartments.insert(id.clone(), name);
                }
            }
            "species" => {
                let attrs = attributes(element)?;
                let id = required(&attrs, "id", "species")?;
                let mut met = Metabolite::new(&id);
                met.name = attrs.get("name").cloned();
                met.compartment = attrs.get("compartment").cloned();
                met.formula = attrs.get("chemicalFormula").cloned();
                met.boundary = attrs
                    .get("boundaryCondition")
                    .map(|v| parse_bool(v))
                    .unwrap_or(false);
                if let Some(charge) = attrs.get("charge") {
                    met.charge = charge
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| SbmlError::InvalidNumber("charge".into(), charge.clone()))?
                        as i32;
                }
                self.species.insert(id, met);
            }
            "parameter" | "localParameter" => {
                let attrs = attributes(element)?;
                let id = required(&attrs, "id", name)?;
                // Parameters without a value can't serve as bounds
                let Some(value) = attrs.get("value") else {
                    return Ok(());
                };
                let value = parse_number("value", value)?;
                if self.in_element("kineticLaw") {
                    if let Some(reaction) = self.current.as_mut() {
                        reaction.kinetic_parameters.insert(id, value);
                    }
                } else {
                    self.parameters.insert(id, value);
                }
            }
            "reaction" => {
                let attrs = attributes(element)?;
                self.current = Some(PendingReaction {
                    id: required(&attrs, "id", "reaction")?,
                    name: attrs.get("name").cloned(),
                    reversible: attrs.get("reversible").map(|v| parse_bool(v)),
                    lower_parameter: attrs.get("lowerFluxBound").cloned(),
                    upper_parameter: attrs.get("upperFluxBound").cloned(),
                    ..Default::default()
                });
            }
            "listOfReactants" => self.species_sign = Some(-1.),
            "listOfProducts" => self.species_sign = Some(1.),
            "speciesReference" => {
                if let (Some(sign), Some(reaction)) = (self.species_sign, self.current.as_mut()) {
                    let attrs = attributes(element)?;
                    let species = required(&attrs, "species", "speciesReference")?;
                    let stoichiometry = match attrs.get("stoichiometry") {
                        Some(value) => parse_number("stoichiometry", value)?,
                        None => 1.,
                    };
                    reaction.species.push((species, sign * stoichiometry));
                }
            }
            "geneProductAssociation" => self.gpr_frames.push(GprFrame::new(GprFrameKind::Root)),
            "and" if !self.gpr_frames.is_empty() => {
                self.gpr_frames.push(GprFrame::new(GprFrameKind::And))
            }
            "or" if !self.gpr_frames.is_empty() => {
                self.gpr_frames.push(GprFrame::new(GprFrameKind::Or))
            }
            "geneProductRef" => {
                let attrs = attributes(element)?;
                let gene = required(&attrs, "geneProduct", "geneProductRef")?;
                if let Some(frame) = self.gpr_frames.last_mut() {
                    frame.children.push(Gpr::new_gene_node(&gene));
                }
                self.gene_products
                    .entry(gene.clone())
                    .or_insert_with(|| Gene::new(&gene));
            }
            "geneProduct" => {
                let attrs = attributes(element)?;
                let id = required(&attrs, "id", "geneProduct")?;
                let gene = self
                    .gene_products
                    .entry(id.clone())
                    .or_insert_with(|| Gene::new(&id));
                gene.name = attrs
                    .get("name")
                    .or_else(|| attrs.get("label"))
                    .cloned();
            }
            "fluxBound" => {
                let attrs = attributes(element)?;
                let reaction = required(&attrs, "reaction", "fluxBound")?;
                let operation = required(&attrs, "operation", "fluxBound")?;
                let value = parse_number("value", &required(&attrs, "value", "fluxBound")?)?;
                self.flux_bounds
                    .entry(reaction)
                    .or_default()
                    .push((operation, value));
            }
            "listOfObjectives" => {
                let attrs = attributes(element)?;
                self.active_objective = attrs.get("activeObjective").cloned();
            }
            "objective" => {
                let attrs = attributes(element)?;
                let id = required(&attrs, "id", "objective")?;
                self.objectives.entry(id.clone()).or_default();
                self.current_objective = Some(id);
            }
            "fluxObjective" => {
                let attrs = attributes(element)?;
                let reaction = required(&attrs, "reaction", "fluxObjective")?;
                let coefficient = match attrs.get("coefficient") {
                    Some(value) => parse_number("coefficient", value)?,
                    None => 1.,
                };
                if let Some(objective) = &self.current_objective {
                    self.objectives
                        .entry(objective.clone())
                        .or_default()
                        .push((reaction, coefficient));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), SbmlError> {
        match name {
            "reaction" => {
                if let Some(reaction) = self.current.take() {
                    self.reactions.push(reaction);
                }
            }
            "listOfReactants" | "listOfProducts" => self.species_sign = None,
            "and" | "or" if self.gpr_frames.len() > 1 => {
                if let Some(frame) = self.gpr_frames.pop() {
                    if let (Some(gpr), Some(parent)) = (frame.fold()?, self.gpr_frames.last_mut())
                    {
                        parent.children.push(gpr);
                    }
                }
            }
            "geneProductAssociation" => {
                if let Some(frame) = self.gpr_frames.pop() {
                    let gpr = frame.fold()?;
                    if let Some(reaction) = self.current.as_mut() {
                        reaction.gpr = gpr;
                    }
                }
                self.gpr_frames.clear();
            }
            "objective" => self.current_objective = None,
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if !self.in_element("notes") {
            return;
        }
        let Some(reaction) = self.current.as_mut() else {
            return;
        };
        let text = text.trim();
        for prefix in GENE_ASSOCIATION_PREFIXES {
            if let Some(rule) = text.strip_prefix(prefix) {
                reaction.gpr_note = Some(rule.trim().to_string());
                return;
            }
        }
        if let Some(subsystem) = text.strip_prefix(SUBSYSTEM_PREFIX) {
            let subsystem = subsystem.trim();
            if !subsystem.is_empty() {
                reaction.subsystem = Some(subsystem.to_string());
            }
        }
    }

    /// Resolve a bound from the FBC parameter reference, kinetic law, or FBC version 1 bounds
    fn resolve_bound(
        &self,
        reaction: &PendingReaction,
        parameter: Option<&String>,
        kinetic_id: &str,
        operation: &str,
    ) -> Result<Option<f64>, SbmlError> {
        if let Some(parameter) = parameter {
            return match self.parameters.get(parameter) {
                Some(value) => Ok(Some(*value)),
                None => Err(SbmlError::UnknownParameter {
                    reaction: reaction.id.clone(),
                    parameter: parameter.clone(),
                }),
            };
        }
        if let Some(value) = reaction.kinetic_parameters.get(kinetic_id) {
            return Ok(Some(*value));
        }
        Ok(self.flux_bounds.get(&reaction.id).and_then(|bounds| {
            bounds
                .iter()
                .rev()
                .find(|(op, _)| op == operation || op == "equal")
                .map(|(_, value)| *value)
        }))
    }

    fn finish(self) -> Result<Model, SbmlError> {
        if !self.seen_model {
            return Err(SbmlError::MissingModel);
        }
        let (default_lower, default_upper) = {
            let config = configuration::read();
            (config.lower_bound, config.upper_bound)
        };
        let mut model = Model::new_empty();
        model.id = self.model_id.clone();
        model.name = self.model_name.clone();
        if !self.compartments.is_empty() {
            model.compartments = Some(self.compartments.clone());
        }
        for met in self.species.values() {
            model.add_metabolite(met.clone());
        }
        let mut genes = self.gene_products.clone();

        let mut legacy_objective = IndexMap::new();
        for pending in &self.reactions {
            let mut metabolites: IndexMap<String, f64> = IndexMap::new();
            for (species, coefficient) in &pending.species {
                if !self.species.contains_key(species) {
                    return Err(SbmlError::UnknownSpecies {
                        reaction: pending.id.clone(),
                        species: species.clone(),
                    });
                }
                *metabolites.entry(species.clone()).or_insert(0.) += coefficient;
            }

            let irreversible = pending.reversible == Some(false);
            let lower_bound = self
                .resolve_bound(
                    pending,
                    pending.lower_parameter.as_ref(),
                    "LOWER_BOUND",
                    "greaterEqual",
                )?
                .unwrap_or(if irreversible { 0. } else { default_lower });
            let upper_bound = self
                .resolve_bound(
                    pending,
                    pending.upper_parameter.as_ref(),
                    "UPPER_BOUND",
                    "lessEqual",
                )?
                .unwrap_or(default_upper);

            let gpr = match (&pending.gpr, &pending.gpr_note) {
                (Some(gpr), _) => Some(gpr.clone()),
                (None, Some(note)) => parse_optional_gpr(note, &mut genes).map_err(|source| {
                    SbmlError::Gpr {
                        reaction: pending.id.clone(),
                        source,
                    }
                })?,
                (None, None) => None,
            };

            if let Some(coefficient) = pending.kinetic_parameters.get("OBJECTIVE_COEFFICIENT") {
                if *coefficient != 0. {
                    legacy_objective.insert(pending.id.clone(), *coefficient);
                }
            }

            model.add_reaction(Reaction {
                id: pending.id.clone(),
                metabolites,
                name: pending.name.clone(),
                gpr,
                lower_bound,
                upper_bound,
                subsystem: pending.subsystem.clone(),
                notes: None,
                annotation: None,
            });
        }
        genes.into_iter().for_each(|(_, gene)| model.add_gene(gene));

        let fbc_objective = self
            .active_objective
            .as_ref()
            .and_then(|id| self.objectives.get(id))
            .or_else(|| self.objectives.values().next());
        match fbc_objective {
            Some(terms) => {
                for (reaction, coefficient) in terms {
                    if !model.reactions.contains_key(reaction) {
                        return Err(SbmlError::UnknownReaction(reaction.clone()));
                    }
                    model.objective.insert(reaction.clone(), *coefficient);
                }
            }
            None => model.objective = legacy_objective,
        }
        if model.objective.is_empty() {
            warn!("SBML model has no objective");
        }

        debug!(
            "Read SBML model with {} reactions, {} metabolites and {} genes",
            model.reactions.len(),
            model.metabolites.len(),
            model.genes.len()
        );
        Ok(model)
    }
}

fn xml_error<E: Display>(err: E) -> SbmlError {
    SbmlError::Xml(err.to_string())
}

fn local_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Attributes of an element, keyed by local name
fn attributes(element: &BytesStart) -> Result<HashMap<String, String>, SbmlError> {
    let mut attrs = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value: Cow<str> = attr.unescape_value().map_err(xml_error)?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

fn required(
    attrs: &HashMap<String, String>,
    attribute: &str,
    element: &str,
) -> Result<String, SbmlError> {
    attrs
        .get(attribute)
        .cloned()
        .ok_or_else(|| SbmlError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        })
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

fn parse_number(attribute: &str, value: &str) -> Result<f64, SbmlError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| SbmlError::InvalidNumber(attribute.to_string(), value.to_string()))
}

/// Errors raised while reading an SBML model
#[derive(Error, Debug)]
pub enum SbmlError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("Malformed XML: {0}")]
    Xml(String),
    #[error("Document has no `model` element")]
    MissingModel,
    #[error("`{element}` element without required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },
    #[error("Invalid number for `{0}`: `{1}`")]
    InvalidNumber(String, String),
    #[error("Reaction `{reaction}` refers to unknown parameter `{parameter}`")]
    UnknownParameter { reaction: String, parameter: String },
    #[error("Reaction `{reaction}` refers to unknown species `{species}`")]
    UnknownSpecies { reaction: String, species: String },
    #[error("Objective refers to unknown reaction `{0}`")]
    UnknownReaction(String),
    #[error("Unable to parse the gene association of reaction `{reaction}`")]
    Gpr {
        reaction: String,
        #[source]
        source: GprParseError,
    },
    #[error("Invalid gene product association")]
    GeneProductAssociation(#[from] GprError),
}
