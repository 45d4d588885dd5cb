// Mapping inference: search a group for nominal lookup tables and (multi-)linear fits

use std::collections::{BTreeMap, BTreeSet};
use std::iter;
use tracing::{debug, trace};

use crate::ir::{min_max, numeric_column, MarkGroup, Value};
use crate::mapping::{LinearParams, Mapping, NominalEntry};
use crate::matrix::{least_squares, Matrix};
use crate::DeconOptions;

/// All nominal and linear mappings of a group, before conflict resolution
pub fn extract_mappings(group: &MarkGroup, options: &DeconOptions) -> Vec<Mapping> {
    let mut mappings = extract_nominal_mappings(group);
    mappings.extend(extract_linear_mappings(group, options));
    mappings
}

pub fn extract_nominal_mappings(group: &MarkGroup) -> Vec<Mapping> {
    let mut mappings = Vec::new();
    for (field, data) in &group.data {
        for (attr, values) in &group.attrs {
            if let Some(mapping) = extract_nominal_mapping(field, attr, data, values) {
                trace!(field = %field, attr = %attr, "nominal mapping");
                mappings.push(mapping);
            }
        }
    }
    mappings
}

/// Exact lookup table from `data` to `attrs`, if one exists. The table must be a
/// function, injective, and have at least two keys.
pub fn extract_nominal_mapping(
    field: &str,
    attr: &str,
    data: &[Value],
    attrs: &[Value],
) -> Option<Mapping> {
    let mut table: Vec<NominalEntry> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    for (d, a) in data.iter().zip(attrs) {
        match index.get(&d.key()).copied() {
            Some(i) if table[i].attr.key() != a.key() => return None,
            Some(_) => {}
            None => {
                index.insert(d.key(), table.len());
                table.push(NominalEntry {
                    data: d.clone(),
                    attr: a.clone(),
                });
            }
        }
    }

    if table.len() < 2 {
        return None;
    }
    let range: BTreeSet<String> = table.iter().map(|e| e.attr.key()).collect();
    if range.len() < table.len() {
        return None;
    }

    Some(Mapping::nominal(field, attr, table))
}

struct Predictor<'a> {
    name: &'a str,
    values: Vec<f64>,
}

/// Linear mappings onto every numeric attribute. For each attribute the smallest
/// predictor count with any accepted fit wins; every accepted subset of that
/// size is kept.
pub fn extract_linear_mappings(group: &MarkGroup, options: &DeconOptions) -> Vec<Mapping> {
    let predictors: Vec<Predictor> = group
        .data
        .iter()
        .filter_map(|(name, column)| {
            numeric_column(column).map(|values| Predictor {
                name: name.as_str(),
                values,
            })
        })
        .collect();
    if predictors.is_empty() || group.is_empty() {
        return Vec::new();
    }

    let max_k = options.max_predictors.min(predictors.len());
    let mut mappings = Vec::new();

    for (attr, column) in &group.attrs {
        let Some(y) = numeric_column(column) else {
            continue;
        };
        let (attr_min, attr_max) = min_max(&y);
        if attr_min == attr_max {
            continue;
        }

        for k in 1..=max_k {
            let accepted: Vec<Mapping> = k_combinations(predictors.len(), k)
                .into_iter()
                .filter_map(|combo| {
                    let subset: Vec<&Predictor> = combo.iter().map(|&i| &predictors[i]).collect();
                    let params = fit_linear(&subset, &y)?;
                    if params.r_squared.is_nan() || params.r_squared <= options.r_squared_threshold {
                        return None;
                    }
                    let fields = subset.iter().map(|p| p.name.to_string()).collect();
                    Some(Mapping::linear(fields, attr, params))
                })
                .collect();

            if !accepted.is_empty() {
                debug!(attr = %attr, k, count = accepted.len(), "accepted linear mappings");
                mappings.extend(accepted);
                break;
            }
        }
    }

    mappings
}

/// Least-squares fit of `y` on the given predictors plus an intercept.
///
/// Predictor columns are centered and scaled to unit spread before solving and
/// the coefficients mapped back to the raw columns afterwards. Returns None for
/// constant predictors and singular systems.
fn fit_linear(predictors: &[&Predictor], y: &[f64]) -> Option<LinearParams> {
    let n = y.len();
    let standardized: Vec<(f64, f64)> = predictors
        .iter()
        .map(|p| center_and_spread(&p.values))
        .collect::<Option<_>>()?;

    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            iter::once(1.0)
                .chain(
                    predictors
                        .iter()
                        .zip(&standardized)
                        .map(|(p, (center, spread))| (p.values[i] - center) / spread),
                )
                .collect()
        })
        .collect();
    let design = Matrix::from_rows(&rows)?;
    let beta = least_squares(&design, y)?;

    let r_squared = r_squared(&rows, &beta, y);

    let slopes: Vec<f64> = beta[1..]
        .iter()
        .zip(&standardized)
        .map(|(b, (_, spread))| b / spread)
        .collect();
    let intercept = beta[0]
        - slopes
            .iter()
            .zip(&standardized)
            .map(|(c, (center, _))| c * center)
            .sum::<f64>();

    Some(LinearParams {
        coeffs: iter::once(intercept).chain(slopes).collect(),
        data_range: predictors.iter().map(|p| min_max(&p.values)).collect(),
        attr_range: min_max(y),
        r_squared,
    })
}

/// Mean and half-range of a column; None when the column is constant
fn center_and_spread(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = min_max(values);
    let spread = (hi - lo) / 2.0;
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (spread > 0.0).then_some((mean, spread))
}

/// Coefficient of determination, `1 - SSE/SST`. NaN for a constant target.
fn r_squared(rows: &[Vec<f64>], beta: &[f64], y: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let (sse, sst) = rows.iter().zip(y).fold((0.0, 0.0), |(sse, sst), (row, &actual)| {
        let predicted: f64 = row.iter().zip(beta).map(|(x, b)| x * b).sum();
        (sse + (actual - predicted).powi(2), sst + (actual - mean).powi(2))
    });
    if sst == 0.0 {
        return f64::NAN;
    }
    1.0 - sse / sst
}

/// Index combinations of size `k` from `0..n`, in lexicographic order
pub fn k_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }

    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        out.push(combo.clone());
        let Some(i) = (0..k).rev().find(|&i| combo[i] < n - k + i) else {
            break;
        };
        combo[i] += 1;
        for j in i + 1..k {
            combo[j] = combo[j - 1] + 1;
        }
    }
    out
}
