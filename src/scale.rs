// Cross-group range reconciliation: mappings on one attribute that cover the
// same span of the chart share a data domain

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::ir::{MappingRef, MappingSet, MarkGroup, SetRange, Value};
use crate::mapping::{MappingKind, MappingParams};
use crate::DeconOptions;

/// Predictor name used for axis tick data, which never joins a set
const TICK_FIELD: &str = "tick";

#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn empty() -> Self {
        MinMax { min: f64::INFINITY, max: f64::NEG_INFINITY }
    }

    fn from_pair((a, b): (f64, f64)) -> Self {
        MinMax { min: a.min(b), max: a.max(b) }
    }

    fn include(&mut self, other: MinMax) {
        if other.min < self.min { self.min = other.min; }
        if other.max > self.max { self.max = other.max; }
    }

    fn overlaps(&self, other: &MinMax, padding: f64) -> bool {
        self.max + padding > other.min && self.min - padding < other.max
    }
}

/// Cluster every group's mappings per attribute and give the single-predictor
/// members of each linear cluster the union of their data ranges
pub fn relate_mapping_ranges(
    groups: &mut [MarkGroup],
    options: &DeconOptions,
) -> BTreeMap<String, Vec<MappingSet>> {
    let mut sets: BTreeMap<String, Vec<MappingSet>> = BTreeMap::new();

    // 1. Cluster
    for (gi, group) in groups.iter().enumerate() {
        for (mi, mapping) in group.mappings.iter().enumerate() {
            if mapping.fields.first().map(String::as_str) == Some(TICK_FIELD) {
                continue;
            }
            let member = MappingRef { group: gi, mapping: mi };
            let attr_sets = sets.entry(mapping.attr.clone()).or_default();
            match &mapping.params {
                MappingParams::Linear(p) => join_linear_set(
                    attr_sets,
                    &mapping.attr,
                    MinMax::from_pair(p.attr_range),
                    member,
                    options.range_padding,
                ),
                MappingParams::Nominal(p) => {
                    join_nominal_set(attr_sets, &mapping.attr, p.range(), member)
                }
                MappingParams::Derived(_) => {}
            }
        }
    }
    sets.retain(|_, attr_sets| !attr_sets.is_empty());

    // 2. Share data ranges within linear sets
    for set in sets.values().flatten() {
        if set.kind == MappingKind::Linear {
            rescale_linear_set(groups, set);
        }
    }

    debug!(
        attrs = sets.len(),
        sets = sets.values().map(Vec::len).sum::<usize>(),
        "related mapping ranges"
    );
    sets
}

fn join_linear_set(
    sets: &mut Vec<MappingSet>,
    attr: &str,
    range: MinMax,
    member: MappingRef,
    padding: f64,
) {
    let found = sets.iter_mut().find(|set| match set.range {
        SetRange::Interval { min, max } => {
            set.kind == MappingKind::Linear && MinMax { min, max }.overlaps(&range, padding)
        }
        SetRange::Values(_) => false,
    });

    match found {
        Some(set) => {
            if let SetRange::Interval { min, max } = &mut set.range {
                *min = min.min(range.min);
                *max = max.max(range.max);
            }
            set.members.push(member);
        }
        None => sets.push(MappingSet {
            attr: attr.to_string(),
            kind: MappingKind::Linear,
            range: SetRange::Interval { min: range.min, max: range.max },
            members: vec![member],
        }),
    }
}

fn join_nominal_set(sets: &mut Vec<MappingSet>, attr: &str, values: Vec<Value>, member: MappingRef) {
    let keys: BTreeSet<String> = values.iter().map(Value::key).collect();
    let found = sets.iter_mut().find(|set| match &set.range {
        SetRange::Values(existing) => {
            set.kind == MappingKind::Nominal && existing.iter().any(|v| keys.contains(&v.key()))
        }
        SetRange::Interval { .. } => false,
    });

    match found {
        Some(set) => {
            if let SetRange::Values(existing) = &mut set.range {
                let known: BTreeSet<String> = existing.iter().map(Value::key).collect();
                existing.extend(values.into_iter().filter(|v| !known.contains(&v.key())));
            }
            set.members.push(member);
        }
        None => sets.push(MappingSet {
            attr: attr.to_string(),
            kind: MappingKind::Nominal,
            range: SetRange::Values(values),
            members: vec![member],
        }),
    }
}

fn rescale_linear_set(groups: &mut [MarkGroup], set: &MappingSet) {
    let single: Vec<MappingRef> = set
        .members
        .iter()
        .copied()
        .filter(|r| groups[r.group].mappings[r.mapping].fields.len() == 1)
        .collect();

    let mut global = MinMax::empty();
    for r in &single {
        let group = &groups[r.group];
        let field = &group.mappings[r.mapping].fields[0];
        if let Some(values) = group.data_numbers(field) {
            for v in values {
                global.include(MinMax { min: v, max: v });
            }
        }
    }
    if global.min > global.max {
        return;
    }

    for r in single {
        if let Some(params) = groups[r.group].mappings[r.mapping].linear_params_mut() {
            params.data_range = vec![(global.min, global.max)];
            params.attr_range = (params.eval(&[global.min]), params.eval(&[global.max]));
        }
    }
}
