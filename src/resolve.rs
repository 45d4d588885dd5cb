use std::collections::BTreeSet;
use tracing::trace;

use crate::derive::ordering_attr;
use crate::ir::DERIVED_PREFIX;
use crate::mapping::{Mapping, MappingKind};

/// Prune mappings that a stronger mapping on the same attribute makes redundant
pub fn filter_extra_mappings(mappings: Vec<Mapping>) -> Vec<Mapping> {
    // 1. Collect which attributes have linear or derived claims, before any pruning
    let linear_attrs = claimed_attrs(&mappings, MappingKind::Linear);
    let derived_attrs = claimed_attrs(&mappings, MappingKind::Derived);

    mappings
        .into_iter()
        .filter(|m| {
            // 2. Nominal yields to linear/derived, derived yields to linear
            let unclaimed = match m.kind() {
                MappingKind::Nominal => {
                    !linear_attrs.contains(m.attr.as_str()) && !derived_attrs.contains(m.attr.as_str())
                }
                MappingKind::Derived => !linear_attrs.contains(m.attr.as_str()),
                MappingKind::Linear => true,
            };
            // 3. An ordering field only explains the attribute it was derived from
            let keep = unclaimed && ordering_matches_target(m);
            if !keep {
                trace!(fields = ?m.fields, attr = %m.attr, kind = ?m.kind(), "dropped mapping");
            }
            keep
        })
        .collect()
}

fn ordering_matches_target(mapping: &Mapping) -> bool {
    mapping
        .fields
        .iter()
        .filter(|f| f.starts_with(DERIVED_PREFIX))
        .all(|f| ordering_attr(f) == Some(mapping.attr.as_str()))
}

fn claimed_attrs(mappings: &[Mapping], kind: MappingKind) -> BTreeSet<String> {
    mappings
        .iter()
        .filter(|m| m.kind() == kind)
        .map(|m| m.attr.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Value;
    use crate::mapping::{LinearParams, NominalEntry};

    fn linear(fields: &[&str], attr: &str) -> Mapping {
        Mapping::linear(
            fields.iter().map(|f| f.to_string()).collect(),
            attr,
            LinearParams {
                coeffs: vec![0.0; fields.len() + 1],
                data_range: vec![(0.0, 1.0); fields.len()],
                attr_range: (0.0, 1.0),
                r_squared: 1.0,
            },
        )
    }

    fn nominal(field: &str, attr: &str) -> Mapping {
        Mapping::nominal(
            field,
            attr,
            vec![
                NominalEntry { data: Value::Number(1.0), attr: Value::Number(10.0) },
                NominalEntry { data: Value::Number(2.0), attr: Value::Number(20.0) },
            ],
        )
    }

    fn summary(mappings: &[Mapping]) -> Vec<(MappingKind, String, String)> {
        mappings
            .iter()
            .map(|m| (m.kind(), m.fields.join(","), m.attr.clone()))
            .collect()
    }

    #[test]
    fn test_nominal_yields_to_linear() {
        let out = filter_extra_mappings(vec![
            nominal("value", "x"),
            linear(&["value"], "x"),
            nominal("value", "fill"),
        ]);
        assert_eq!(
            summary(&out),
            vec![
                (MappingKind::Linear, "value".into(), "x".into()),
                (MappingKind::Nominal, "value".into(), "fill".into()),
            ]
        );
    }

    #[test]
    fn test_derived_yields_to_linear() {
        let out = filter_extra_mappings(vec![
            linear(&["_deriv_x_0"], "x"),
            linear(&["value"], "x"),
            linear(&["_deriv_y_0"], "y"),
            nominal("category", "y"),
        ]);
        assert_eq!(
            summary(&out),
            vec![
                (MappingKind::Linear, "value".into(), "x".into()),
                (MappingKind::Derived, "_deriv_y_0".into(), "y".into()),
            ]
        );
    }

    #[test]
    fn test_ordering_suffix_must_match_target() {
        let out = filter_extra_mappings(vec![
            linear(&["_deriv_x_0"], "width"),
            linear(&["_deriv_x_0"], "x"),
            linear(&["_line_index"], "y"),
        ]);
        assert_eq!(
            summary(&out),
            vec![
                (MappingKind::Derived, "_deriv_x_0".into(), "x".into()),
                (MappingKind::Derived, "_line_index".into(), "y".into()),
            ]
        );
    }

    #[test]
    fn test_mismatched_ordering_still_claims_attr() {
        // Claims are collected before the suffix check, so the mismatched
        // derived mapping knocks out the nominal one and is then dropped itself
        let out = filter_extra_mappings(vec![linear(&["_deriv_y_1"], "x"), nominal("c", "x")]);
        assert!(out.is_empty(), "kept {:?}", summary(&out));
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            nominal("value", "x"),
            linear(&["value"], "x"),
            linear(&["_deriv_x_0"], "x"),
            linear(&["_deriv_y_0"], "y"),
            linear(&["_deriv_x_0"], "height"),
            nominal("category", "fill"),
        ];
        let once = filter_extra_mappings(input);
        let twice = filter_extra_mappings(once.clone());
        assert_eq!(once, twice);
    }
}
