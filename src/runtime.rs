// Runtime executor for the deconstruction pipeline

use tracing::info;

use crate::data::ChartInput;
use crate::derive::update_derived_fields;
use crate::infer::extract_mappings;
use crate::ir::{Deconstruction, MarkGroup};
use crate::lines::expand_lines;
use crate::normalize::normalize_marks;
use crate::recombine::recombine_groups;
use crate::resolve::filter_extra_mappings;
use crate::scale::relate_mapping_ranges;
use crate::schema::{group_marks, GroupedMarks};
use crate::DeconOptions;

/// Recover data groups and their data -> attribute mappings from a chart's marks
pub fn deconstruct(input: ChartInput, options: &DeconOptions) -> Deconstruction {
    let ChartInput { size, marks, axes } = input;
    info!(marks = marks.len(), "deconstructing chart");

    // 1. Split bound paths into points, then type every record.
    // Expansion goes first so per-vertex records get the same type vote as other marks.
    let marks = normalize_marks(expand_lines(marks));

    // 2. Group by schema
    let GroupedMarks { mut groups, unbound } = group_marks(marks);
    info!(groups = groups.len(), unbound = unbound.len(), "grouped marks");

    // 3. First inference pass, with mark ids visible
    infer_group_mappings(&mut groups, options);

    // 4. Rejoin split series
    let mut groups = recombine_groups(groups, options);

    // 5. Replace mark ids with ordering fields and infer again
    update_derived_fields(&mut groups, options);
    infer_group_mappings(&mut groups, options);

    // 6. Reconcile ranges across groups
    let mapping_sets = relate_mapping_ranges(&mut groups, options);

    info!(
        groups = groups.len(),
        mappings = groups.iter().map(|g| g.mappings.len()).sum::<usize>(),
        "deconstruction complete"
    );

    Deconstruction {
        size,
        groups,
        mapping_sets,
        axes,
        unbound,
    }
}

fn infer_group_mappings(groups: &mut [MarkGroup], options: &DeconOptions) {
    for group in groups.iter_mut() {
        group.mappings = filter_extra_mappings(extract_mappings(group, options));
    }
}
