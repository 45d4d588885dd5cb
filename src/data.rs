use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Read;

use crate::ir::{BoundingBox, ChartSize, MarkGroup};

/// A mark as delivered by the scene extraction step, before typing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMark {
    pub id: usize,
    #[serde(default)]
    pub data: JsonValue,
    #[serde(default)]
    pub attrs: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub node_attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub axis: Option<String>,
    /// Vertex positions of a path, in document coordinates
    #[serde(default)]
    pub vertices: Option<Vec<[f64; 2]>>,
    /// Set on per-vertex marks split from a path
    #[serde(skip)]
    pub line_index: Option<usize>,
}

impl RawMark {
    pub fn shape(&self) -> Option<&str> {
        self.attrs.get("shape").and_then(JsonValue::as_str)
    }
}

/// Axis found by the extraction step; carried through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    pub orientation: String,
    #[serde(default)]
    pub scale_domain: Vec<JsonValue>,
    #[serde(default)]
    pub scale_range: Vec<f64>,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

/// Everything the deconstruction consumes for one chart
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartInput {
    #[serde(default)]
    pub size: ChartSize,
    pub marks: Vec<RawMark>,
    #[serde(default)]
    pub axes: Vec<AxisDescriptor>,
}

impl ChartInput {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Input must be a chart object with a 'marks' array")
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("Failed to parse chart JSON")
    }
}

/// Render a group's data columns as CSV, one row per mark
pub fn group_to_csv(group: &MarkGroup) -> Result<String> {
    let headers: Vec<&str> = group.data.keys().map(String::as_str).collect();
    if headers.is_empty() {
        return Err(anyhow!("Group has no data fields to export"));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&headers)
        .context("Failed to write CSV header")?;

    for row in 0..group.len() {
        let record: Vec<String> = group.data.values().map(|col| col[row].to_string()).collect();
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write CSV row {}", row))?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
