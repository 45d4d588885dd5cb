// Library exports for chartdecon

pub mod data;
pub mod derive;
pub mod infer;
pub mod ir;
pub mod lines;
pub mod mapping;
pub mod matrix;
pub mod normalize;
pub mod parser;
pub mod recombine;
pub mod resolve;
pub mod runtime;
pub mod scale;
pub mod schema;

pub use data::ChartInput;
pub use ir::Deconstruction;
pub use runtime::deconstruct;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Thresholds and tolerances of the inference passes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeconOptions {
    /// A linear fit is accepted only when R² exceeds this
    #[serde(default = "default_r_squared_threshold")]
    pub r_squared_threshold: f64,
    #[serde(default = "default_max_predictors")]
    pub max_predictors: usize,
    /// Per-coefficient tolerance when comparing linear mappings of two groups
    #[serde(default = "default_coefficient_tolerance")]
    pub coefficient_tolerance: f64,
    /// Slack, in attribute units, when testing linear ranges for overlap
    #[serde(default = "default_range_padding")]
    pub range_padding: f64,
    /// Attributes that receive a derived rank field
    #[serde(default = "default_ordering_attrs")]
    pub ordering_attrs: Vec<String>,
}

fn default_r_squared_threshold() -> f64 { 0.9999 }
fn default_max_predictors() -> usize { 3 }
fn default_coefficient_tolerance() -> f64 { 1.5 }
fn default_range_padding() -> f64 { 2.0 }
fn default_ordering_attrs() -> Vec<String> {
    ["x", "y", "width", "height"].iter().map(|s| s.to_string()).collect()
}

impl Default for DeconOptions {
    fn default() -> Self {
        Self {
            r_squared_threshold: default_r_squared_threshold(),
            max_predictors: default_max_predictors(),
            coefficient_tolerance: default_coefficient_tolerance(),
            range_padding: default_range_padding(),
            ordering_attrs: default_ordering_attrs(),
        }
    }
}

impl DeconOptions {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Invalid options JSON")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to load options from {}", path.display()))
    }
}
