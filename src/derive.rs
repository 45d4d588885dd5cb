// Derived ordering fields: the rank of each mark along a positional attribute

use tracing::debug;

use crate::ir::{MarkGroup, Value, DERIVED_PREFIX, MARK_ID_FIELD};
use crate::DeconOptions;

pub fn ordering_field_name(attr: &str, group_index: usize) -> String {
    format!("{}{}_{}", DERIVED_PREFIX, attr, group_index)
}

/// Attribute an ordering field was derived from, e.g. `x` for `_deriv_x_3`
pub fn ordering_attr(field: &str) -> Option<&str> {
    let rest = field.strip_prefix(DERIVED_PREFIX)?;
    let (attr, index) = rest.rsplit_once('_')?;
    if attr.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(attr)
}

/// Rank of each row when sorted by `values`; ties keep row order
fn ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    for (rank, &row) in order.iter().enumerate() {
        ranks[row] = rank;
    }
    ranks
}

/// Sorted values rounded to whole units; equal signatures mean equal orderings
fn signature(values: &[f64]) -> Vec<i64> {
    let mut rounded: Vec<i64> = values.iter().map(|v| v.round() as i64).collect();
    rounded.sort_unstable();
    rounded
}

/// Drop the mark-id field and add a rank field per ordering attribute.
/// Orderings that match one computed earlier reuse its field name, so groups
/// laid out along the same positions share one synthetic field.
pub fn update_derived_fields(groups: &mut [MarkGroup], options: &DeconOptions) {
    for group in groups.iter_mut() {
        group.data.remove(MARK_ID_FIELD);
        group.mappings.retain(|m| !m.uses_field(MARK_ID_FIELD));
    }

    for attr in &options.ordering_attrs {
        let mut seen: Vec<(Vec<i64>, String)> = Vec::new();

        for (gi, group) in groups.iter_mut().enumerate() {
            let Some(values) = group.attr_numbers(attr) else {
                continue;
            };

            let sig = signature(&values);
            let name = match seen.iter().find(|(s, _)| *s == sig) {
                Some((_, existing)) => {
                    debug!(attr = %attr, group = gi, field = %existing, "coalesced ordering");
                    existing.clone()
                }
                None => {
                    let name = ordering_field_name(attr, gi);
                    seen.push((sig, name.clone()));
                    name
                }
            };

            let column = ranks(&values)
                .into_iter()
                .map(|r| Value::Number(r as f64))
                .collect();
            group.data.insert(name, column);
        }
    }
}
