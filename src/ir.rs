use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::data::AxisDescriptor;
use crate::mapping::{Mapping, MappingKind};

/// Data field holding the mark identifier, visible to the first inference pass only
pub const MARK_ID_FIELD: &str = "_mark_id";
/// Data field holding a line point's vertex position
pub const LINE_INDEX_FIELD: &str = "_line_index";
/// Prefix of synthetic ordering fields (`_deriv_<attr>_<group>`)
pub const DERIVED_PREFIX: &str = "_deriv_";
/// Shape kind given to per-vertex marks split from a path
pub const LINE_POINT_SHAPE: &str = "linePoint";

/// True for fields that do not come from the source data
pub fn is_synthetic(field: &str) -> bool {
    field.starts_with(DERIVED_PREFIX) || field == LINE_INDEX_FIELD
}

// =============================================================================
// Values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// A typed data or attribute value after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Color(Rgb),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string form used for exact lookup-table comparison
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn empty() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Color(c) => write!(f, "{}", c),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Color(c) => serializer.collect_str(c),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Field name -> value record of a single mark
pub type Record = BTreeMap<String, Value>;

/// Returns the column as numbers when every entry is numeric
pub fn numeric_column(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_number).collect()
}

pub fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

// =============================================================================
// Marks
// =============================================================================

/// One visual element with typed data and attribute records
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub id: usize,
    pub data: Record,
    pub attrs: Record,
    pub node_attrs: BTreeMap<String, String>,
    pub axis: Option<String>,
    pub line_index: Option<usize>,
}

impl Mark {
    pub fn shape(&self) -> &str {
        self.attrs.get("shape").and_then(Value::as_text).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize, Default)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
}

// =============================================================================
// Groups
// =============================================================================

/// Column-oriented set of marks sharing data fields, shape kind and axis.
/// Every column has exactly `len()` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    pub shape: String,
    pub data: BTreeMap<String, Vec<Value>>,
    pub attrs: BTreeMap<String, Vec<Value>>,
    pub ids: Vec<usize>,
    pub node_attrs: Vec<BTreeMap<String, String>>,
    pub mappings: Vec<Mapping>,
}

impl MarkGroup {
    pub fn from_mark(mark: Mark) -> Self {
        let shape = mark.shape().to_string();
        let name = mark.axis.as_ref().and_then(|axis| {
            let suffix = match shape.as_str() {
                "text" => "labels",
                "line" => "ticks",
                LINE_POINT_SHAPE => "line",
                _ => return None,
            };
            Some(format!("{}-{}", axis, suffix))
        });

        let mut group = MarkGroup {
            name,
            axis: mark.axis.clone(),
            shape,
            data: mark.data.keys().map(|k| (k.clone(), Vec::new())).collect(),
            ..Default::default()
        };
        group.push_mark(mark);
        group
    }

    /// Whether `mark` belongs to this group's schema
    pub fn accepts(&self, mark: &Mark) -> bool {
        self.shape == mark.shape()
            && self.axis == mark.axis
            && self.data.keys().eq(mark.data.keys())
    }

    /// Append a mark whose field set matches this group
    pub fn push_mark(&mut self, mark: Mark) {
        let n = self.len();
        let Mark { id, mut data, attrs, node_attrs, .. } = mark;

        for (field, column) in self.data.iter_mut() {
            column.push(data.remove(field).unwrap_or_else(Value::empty));
        }

        for (attr, value) in attrs {
            self.attrs
                .entry(attr)
                .or_insert_with(|| vec![Value::empty(); n])
                .push(value);
        }
        for column in self.attrs.values_mut() {
            if column.len() == n {
                column.push(Value::empty());
            }
        }

        self.ids.push(id);
        self.node_attrs.push(node_attrs);
    }

    /// Append every mark of `other`, padding attribute columns either side lacks
    pub fn append(&mut self, other: MarkGroup) {
        let n = self.len();
        let m = other.len();

        for (field, values) in other.data {
            self.data
                .entry(field)
                .or_insert_with(|| vec![Value::empty(); n])
                .extend(values);
        }
        for (attr, values) in other.attrs {
            self.attrs
                .entry(attr)
                .or_insert_with(|| vec![Value::empty(); n])
                .extend(values);
        }
        for column in self.data.values_mut().chain(self.attrs.values_mut()) {
            column.resize(n + m, Value::empty());
        }

        self.ids.extend(other.ids);
        self.node_attrs.extend(other.node_attrs);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn field_names(&self) -> BTreeSet<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    pub fn data_numbers(&self, field: &str) -> Option<Vec<f64>> {
        self.data.get(field).and_then(|c| numeric_column(c))
    }

    pub fn attr_numbers(&self, attr: &str) -> Option<Vec<f64>> {
        self.attrs.get(attr).and_then(|c| numeric_column(c))
    }

    pub fn attr_is_mapped(&self, attr: &str) -> bool {
        self.mappings.iter().any(|m| m.attr == attr)
    }

    pub fn mapping_for_attr(&self, attr: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.attr == attr)
    }

    /// Mapping whose first predictor is `field` and whose target is `attr`
    pub fn mapping(&self, field: &str, attr: &str) -> Option<&Mapping> {
        self.mappings
            .iter()
            .find(|m| m.attr == attr && m.fields.first().map(String::as_str) == Some(field))
    }

    /// Distinct values of a data field (or attribute when `is_attr`), first-seen order
    pub fn unique_values(&self, name: &str, is_attr: bool) -> Vec<Value> {
        let column = if is_attr { self.attrs.get(name) } else { self.data.get(name) };
        let mut seen = BTreeSet::new();
        column
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(v.key()))
            .cloned()
            .collect()
    }

    /// Recompute mapped attribute columns from the data columns, e.g. after a data edit.
    /// Rows whose inputs the mapping cannot evaluate keep their current value.
    pub fn apply_mappings(&mut self) {
        for mapping in &self.mappings {
            let inputs: Option<Vec<&Vec<Value>>> =
                mapping.fields.iter().map(|f| self.data.get(f)).collect();
            let (Some(inputs), Some(column)) = (inputs, self.attrs.get_mut(&mapping.attr)) else {
                continue;
            };
            for (row, slot) in column.iter_mut().enumerate() {
                let args: Vec<Value> = inputs.iter().map(|c| c[row].clone()).collect();
                if let Some(value) = mapping.map(&args) {
                    *slot = value;
                }
            }
        }
    }

    /// Union of the marks' boxes, from center position and size attributes
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let x = self.attr_numbers("x")?;
        let y = self.attr_numbers("y")?;
        let w = self.attr_numbers("width").unwrap_or_else(|| vec![0.0; x.len()]);
        let h = self.attr_numbers("height").unwrap_or_else(|| vec![0.0; x.len()]);
        if x.is_empty() {
            return None;
        }

        let (mut x_min, mut y_min) = (f64::INFINITY, f64::INFINITY);
        let (mut x_max, mut y_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for i in 0..x.len() {
            x_min = x_min.min(x[i] - w[i] / 2.0);
            x_max = x_max.max(x[i] + w[i] / 2.0);
            y_min = y_min.min(y[i] - h[i] / 2.0);
            y_max = y_max.max(y[i] + h[i] / 2.0);
        }

        Some(BoundingBox {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        })
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Position of a mapping within the group collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappingRef {
    pub group: usize,
    pub mapping: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SetRange {
    Interval { min: f64, max: f64 },
    Values(Vec<Value>),
}

/// Cross-group cluster of same-kind mappings on one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSet {
    pub attr: String,
    pub kind: MappingKind,
    pub range: SetRange,
    pub members: Vec<MappingRef>,
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deconstruction {
    pub size: ChartSize,
    pub groups: Vec<MarkGroup>,
    pub mapping_sets: BTreeMap<String, Vec<MappingSet>>,
    pub axes: Vec<AxisDescriptor>,
    pub unbound: Vec<usize>,
}

impl Deconstruction {
    pub fn group_by_name(&self, name: &str) -> Option<&MarkGroup> {
        self.groups.iter().find(|g| g.name.as_deref() == Some(name))
    }

    /// Every non-derived mapping on `attr`, tagged with its group index
    pub fn mappings_for_attr(&self, attr: &str) -> Vec<(usize, &Mapping)> {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| g.mappings.iter().map(move |m| (i, m)))
            .filter(|(_, m)| m.attr == attr && m.kind() != MappingKind::Derived)
            .collect()
    }

    /// Chart box grown to contain every group's marks
    pub fn mark_bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: self.size.width,
            height: self.size.height,
        };
        for group_box in self.groups.iter().filter_map(MarkGroup::bounding_box) {
            bounds.width = bounds.width.max(group_box.x + group_box.width);
            bounds.height = bounds.height.max(group_box.y + group_box.height);
        }
        bounds
    }
}
