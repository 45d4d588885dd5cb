// Group recombination: rejoin series that extraction split into several groups

use tracing::debug;

use crate::ir::{MarkGroup, MARK_ID_FIELD};
use crate::DeconOptions;

/// Merge every later group that describes the same series into the first one.
/// Absorbed groups are flagged during the pass and dropped at the end.
pub fn recombine_groups(mut groups: Vec<MarkGroup>, options: &DeconOptions) -> Vec<MarkGroup> {
    let tolerance = options.coefficient_tolerance;
    let mut absorbed = vec![false; groups.len()];

    for i in 0..groups.len() {
        if absorbed[i] {
            continue;
        }
        for j in (i + 1)..groups.len() {
            if absorbed[j] || !should_combine(&groups[i], &groups[j], tolerance) {
                continue;
            }
            debug!(into = i, from = j, marks = groups[j].len(), "recombining groups");
            let other = std::mem::take(&mut groups[j]);
            merge_groups(&mut groups[i], other, tolerance);
            absorbed[j] = true;
        }
    }

    groups
        .into_iter()
        .zip(absorbed)
        .filter_map(|(group, gone)| (!gone).then_some(group))
        .collect()
}

/// Unnamed groups with the same fields whose mappings (ignoring any on the
/// mark id) all have an equal counterpart in `other`
pub fn should_combine(group: &MarkGroup, other: &MarkGroup, tolerance: f64) -> bool {
    if group.name.is_some() || other.name.is_some() {
        return false;
    }
    if !group.data.keys().eq(other.data.keys()) {
        return false;
    }

    group
        .mappings
        .iter()
        .filter(|m| !m.uses_field(MARK_ID_FIELD))
        .all(|m| other.mappings.iter().any(|o| m.is_equal_to(o, tolerance)))
}

fn merge_groups(group: &mut MarkGroup, mut other: MarkGroup, tolerance: f64) {
    let mappings = std::mem::take(&mut other.mappings);
    group.append(other);

    for mapping in mappings {
        if !group.mappings.iter().any(|m| m.is_equal_to(&mapping, tolerance)) {
            group.mappings.push(mapping);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Mark, Value};
    use crate::mapping::{LinearParams, Mapping};
    use std::collections::BTreeMap;

    fn group(ids: &[usize], fields: &[&str], mappings: Vec<Mapping>) -> MarkGroup {
        let mark = |id: usize| Mark {
            id,
            data: fields
                .iter()
                .map(|f| (f.to_string(), Value::Number(id as f64)))
                .collect(),
            attrs: BTreeMap::from([("shape".to_string(), Value::Text("rect".into()))]),
            node_attrs: BTreeMap::new(),
            axis: None,
            line_index: None,
        };
        let mut g = MarkGroup::from_mark(mark(ids[0]));
        for &id in &ids[1..] {
            g.push_mark(mark(id));
        }
        g.mappings = mappings;
        g
    }

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

    #[test]
    fn test_equal_mappings_merge() {
        let groups = vec![
            group(&[0, 1], &["v"], vec![linear("v", "y", vec![100.0, -2.0])]),
            group(&[2, 3, 4], &["v"], vec![linear("v", "y", vec![100.5, -2.0])]),
        ];
        let out = recombine_groups(groups, &DeconOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(out[0].mappings.len(), 1);
        for column in out[0].data.values().chain(out[0].attrs.values()) {
            assert_eq!(column.len(), 5);
        }
    }

    #[test]
    fn test_mark_counts_preserved() {
        let groups = vec![
            group(&[0, 1], &["v"], vec![linear("v", "y", vec![0.0, 1.0])]),
            group(&[2], &["w"], vec![]),
            group(&[3, 4], &["v"], vec![linear("v", "y", vec![0.0, 1.0])]),
            group(&[5], &["v"], vec![linear("v", "y", vec![50.0, 1.0])]),
        ];
        let total: usize = groups.iter().map(MarkGroup::len).sum();
        let out = recombine_groups(groups, &DeconOptions::default());
        assert_eq!(out.len(), 3);
        assert_eq!(out.iter().map(MarkGroup::len).sum::<usize>(), total);
        assert_eq!(out[0].ids, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_named_groups_stay_apart() {
        let mut a = group(&[0], &["v"], vec![]);
        a.name = Some("xaxis-labels".into());
        let b = group(&[1], &["v"], vec![]);
        assert!(!should_combine(&a, &b, 1.5));
        assert!(!should_combine(&b, &a, 1.5));
    }

    #[test]
    fn test_different_fields_stay_apart() {
        let a = group(&[0], &["v"], vec![]);
        let b = group(&[1], &["v", "w"], vec![]);
        assert!(!should_combine(&a, &b, 1.5));
    }

    #[test]
    fn test_mark_id_mapping_ignored() {
        let a = group(
            &[0],
            &["v", MARK_ID_FIELD],
            vec![linear(MARK_ID_FIELD, "x", vec![0.0, 10.0]), linear("v", "y", vec![0.0, 1.0])],
        );
        let b = group(&[1], &["v", MARK_ID_FIELD], vec![linear("v", "y", vec![0.0, 1.0])]);
        assert!(should_combine(&a, &b, 1.5));
    }

    #[test]
    fn test_unmatched_absorbed_mapping_added() {
        let groups = vec![
            group(&[0], &["v"], vec![linear("v", "y", vec![0.0, 1.0])]),
            group(
                &[1],
                &["v"],
                vec![linear("v", "y", vec![0.0, 1.0]), linear("v", "height", vec![0.0, 3.0])],
            ),
        ];
        let out = recombine_groups(groups, &DeconOptions::default());
        assert_eq!(out.len(), 1);
        let attrs: Vec<&str> = out[0].mappings.iter().map(|m| m.attr.as_str()).collect();
        assert_eq!(attrs, vec!["y", "height"]);
    }
}
