// Inferred data -> attribute encodings

use serde::Serialize;

use crate::ir::{is_synthetic, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Nominal,
    Linear,
    Derived,
}

/// One row of a nominal lookup table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NominalEntry {
    pub data: Value,
    pub attr: Value,
}

/// Exact lookup table, in first-seen key order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NominalParams {
    pub table: Vec<NominalEntry>,
}

impl NominalParams {
    pub fn lookup(&self, data: &Value) -> Option<&Value> {
        let key = data.key();
        self.table.iter().find(|e| e.data.key() == key).map(|e| &e.attr)
    }

    pub fn domain(&self) -> Vec<Value> {
        self.table.iter().map(|e| e.data.clone()).collect()
    }

    pub fn range(&self) -> Vec<Value> {
        self.table.iter().map(|e| e.attr.clone()).collect()
    }
}

/// Affine fit `attr = coeffs[0] + sum(coeffs[i] * x_i)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearParams {
    pub coeffs: Vec<f64>,
    /// Observed (min, max) of each predictor, in predictor order
    pub data_range: Vec<(f64, f64)>,
    /// Observed (min, max) of the attribute; recomputed from the data range
    /// when ranges are reconciled across groups
    pub attr_range: (f64, f64),
    pub r_squared: f64,
}

impl LinearParams {
    pub fn eval(&self, xs: &[f64]) -> f64 {
        self.coeffs
            .iter()
            .skip(1)
            .zip(xs)
            .fold(self.coeffs[0], |acc, (c, x)| acc + c * x)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MappingParams {
    Nominal(NominalParams),
    Linear(LinearParams),
    /// A linear fit on at least one synthetic predictor
    Derived(LinearParams),
}

/// A function from one or more data fields to one visual attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    pub fields: Vec<String>,
    pub attr: String,
    #[serde(flatten)]
    pub params: MappingParams,
}

impl Mapping {
    pub fn nominal(field: &str, attr: &str, table: Vec<NominalEntry>) -> Self {
        Mapping {
            fields: vec![field.to_string()],
            attr: attr.to_string(),
            params: MappingParams::Nominal(NominalParams { table }),
        }
    }

    /// Builds a linear mapping, tagged derived when any predictor is synthetic
    pub fn linear(fields: Vec<String>, attr: &str, params: LinearParams) -> Self {
        let params = if fields.iter().any(|f| is_synthetic(f)) {
            MappingParams::Derived(params)
        } else {
            MappingParams::Linear(params)
        };
        Mapping {
            fields,
            attr: attr.to_string(),
            params,
        }
    }

    pub fn kind(&self) -> MappingKind {
        match self.params {
            MappingParams::Nominal(_) => MappingKind::Nominal,
            MappingParams::Linear(_) => MappingKind::Linear,
            MappingParams::Derived(_) => MappingKind::Derived,
        }
    }

    pub fn linear_params(&self) -> Option<&LinearParams> {
        match &self.params {
            MappingParams::Linear(p) | MappingParams::Derived(p) => Some(p),
            MappingParams::Nominal(_) => None,
        }
    }

    pub fn linear_params_mut(&mut self) -> Option<&mut LinearParams> {
        match &mut self.params {
            MappingParams::Linear(p) | MappingParams::Derived(p) => Some(p),
            MappingParams::Nominal(_) => None,
        }
    }

    pub fn uses_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Attribute value for the given predictor values (one per field)
    pub fn map(&self, inputs: &[Value]) -> Option<Value> {
        match &self.params {
            MappingParams::Nominal(p) => p.lookup(inputs.first()?).cloned(),
            MappingParams::Linear(p) | MappingParams::Derived(p) => {
                if inputs.len() != self.fields.len() {
                    return None;
                }
                let xs: Option<Vec<f64>> = inputs.iter().map(Value::as_number).collect();
                Some(Value::Number(p.eval(&xs?)))
            }
        }
    }

    /// Data value producing `attr`. Only single-predictor mappings invert.
    pub fn invert(&self, attr: &Value) -> Option<Value> {
        match &self.params {
            MappingParams::Nominal(p) => {
                let key = attr.key();
                p.table.iter().find(|e| e.attr.key() == key).map(|e| e.data.clone())
            }
            MappingParams::Linear(p) | MappingParams::Derived(p) => {
                if p.coeffs.len() != 2 || p.coeffs[1] == 0.0 {
                    return None;
                }
                let y = attr.as_number()?;
                Some(Value::Number((y - p.coeffs[0]) / p.coeffs[1]))
            }
        }
    }

    /// Equality used when deciding whether two groups are one series: same kind,
    /// fields and attribute; nominal tables agree on every key of `self`;
    /// coefficients agree within `tolerance`.
    pub fn is_equal_to(&self, other: &Mapping, tolerance: f64) -> bool {
        if self.attr != other.attr || self.fields != other.fields {
            return false;
        }
        match (&self.params, &other.params) {
            (MappingParams::Nominal(a), MappingParams::Nominal(b)) => a
                .table
                .iter()
                .all(|e| b.lookup(&e.data).map(Value::key) == Some(e.attr.key())),
            (MappingParams::Linear(a), MappingParams::Linear(b))
            | (MappingParams::Derived(a), MappingParams::Derived(b)) => {
                a.coeffs.len() == b.coeffs.len()
                    && a
                        .coeffs
                        .iter()
                        .zip(&b.coeffs)
                        .all(|(x, y)| (x - y).abs() <= tolerance)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(field: &str, attr: &str, coeffs: Vec<f64>) -> Mapping {
        Mapping::linear(
            vec![field.to_string()],
            attr,
            LinearParams {
                coeffs,
                data_range: vec![(0.0, 1.0)],
                attr_range: (0.0, 1.0),
                r_squared: 1.0,
            },
        )
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn color_table() -> Mapping {
        Mapping::nominal(
            "category",
            "fill",
            vec![
                NominalEntry { data: text("A"), attr: text("red") },
                NominalEntry { data: text("B"), attr: text("blue") },
            ],
        )
    }

    #[test]
    fn test_linear_tagged_derived_for_synthetic_field() {
        assert_eq!(linear("value", "x", vec![0.0, 1.0]).kind(), MappingKind::Linear);
        assert_eq!(linear("_deriv_x_0", "x", vec![0.0, 1.0]).kind(), MappingKind::Derived);
        assert_eq!(linear("_line_index", "x", vec![0.0, 1.0]).kind(), MappingKind::Derived);
    }

    #[test]
    fn test_map_and_invert_linear() {
        let m = linear("value", "x", vec![10.0, 2.0]);
        assert_eq!(m.map(&[Value::Number(3.0)]), Some(Value::Number(16.0)));
        assert_eq!(m.invert(&Value::Number(16.0)), Some(Value::Number(3.0)));
        assert_eq!(m.map(&[text("nope")]), None);
    }

    #[test]
    fn test_map_and_invert_nominal() {
        let m = color_table();
        assert_eq!(m.map(&[text("B")]), Some(text("blue")));
        assert_eq!(m.map(&[text("C")]), None);
        assert_eq!(m.invert(&text("red")), Some(text("A")));
    }

    #[test]
    fn test_invert_multi_linear_unsupported() {
        let m = Mapping::linear(
            vec!["a".into(), "b".into()],
            "y",
            LinearParams {
                coeffs: vec![1.0, 2.0, 3.0],
                data_range: vec![(0.0, 1.0), (0.0, 1.0)],
                attr_range: (1.0, 6.0),
                r_squared: 1.0,
            },
        );
        assert_eq!(m.map(&[Value::Number(1.0), Value::Number(1.0)]), Some(Value::Number(6.0)));
        assert_eq!(m.invert(&Value::Number(6.0)), None);
    }

    #[test]
    fn test_linear_equality_tolerance() {
        let a = linear("value", "x", vec![10.0, 2.0]);
        assert!(a.is_equal_to(&linear("value", "x", vec![11.4, 2.5]), 1.5));
        assert!(!a.is_equal_to(&linear("value", "x", vec![11.6, 2.0]), 1.5));
        assert!(!a.is_equal_to(&linear("value", "y", vec![10.0, 2.0]), 1.5));
    }

    #[test]
    fn test_nominal_equality_is_subset_of_first() {
        let a = color_table();
        let mut b = color_table();
        if let MappingParams::Nominal(p) = &mut b.params {
            p.table.push(NominalEntry { data: text("C"), attr: text("green") });
        }
        assert!(a.is_equal_to(&b, 1.5));
        assert!(!b.is_equal_to(&a, 1.5));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(linear("value", "x", vec![10.0, 2.0])).unwrap();
        assert_eq!(json["type"], "linear");
        assert_eq!(json["attr"], "x");
        assert_eq!(json["coeffs"][1], 2.0);
    }
}
