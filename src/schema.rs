// Schema grouping: marks with the same data fields, shape and axis form a group

use tracing::debug;

use crate::ir::{Mark, MarkGroup, Value, LINE_INDEX_FIELD, MARK_ID_FIELD};

#[derive(Debug, Clone, Default)]
pub struct GroupedMarks {
    pub groups: Vec<MarkGroup>,
    /// Identifiers of marks with no data fields
    pub unbound: Vec<usize>,
}

/// Bucket marks into groups, in mark order. Each bound mark first receives its
/// identifier (and line position, if any) as data fields.
pub fn group_marks(marks: Vec<Mark>) -> GroupedMarks {
    let mut grouped = GroupedMarks::default();

    for mut mark in marks {
        if mark.data.is_empty() {
            grouped.unbound.push(mark.id);
            continue;
        }

        mark.data
            .insert(MARK_ID_FIELD.to_string(), Value::Number(mark.id as f64));
        if let Some(index) = mark.line_index {
            mark.data
                .insert(LINE_INDEX_FIELD.to_string(), Value::Number(index as f64));
        }

        match grouped.groups.iter_mut().find(|g| g.accepts(&mark)) {
            Some(group) => group.push_mark(mark),
            None => grouped.groups.push(MarkGroup::from_mark(mark)),
        }
    }

    debug!(
        groups = grouped.groups.len(),
        unbound = grouped.unbound.len(),
        "grouped marks"
    );
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Record;
    use std::collections::{BTreeMap, BTreeSet};

    fn mark(id: usize, fields: &[&str], shape: &str, axis: Option<&str>) -> Mark {
        let data: Record = fields
            .iter()
            .map(|f| (f.to_string(), Value::Number(id as f64)))
            .collect();
        Mark {
            id,
            data,
            attrs: BTreeMap::from([("shape".to_string(), Value::Text(shape.to_string()))]),
            node_attrs: BTreeMap::new(),
            axis: axis.map(str::to_string),
            line_index: None,
        }
    }

    #[test]
    fn test_groups_by_field_set() {
        let grouped = group_marks(vec![
            mark(0, &["a", "b"], "circle", None),
            mark(1, &["a"], "circle", None),
            mark(2, &["b", "a"], "circle", None),
        ]);
        assert_eq!(grouped.groups.len(), 2);
        assert_eq!(grouped.groups[0].ids, vec![0, 2]);
        assert_eq!(grouped.groups[1].ids, vec![1]);
    }

    #[test]
    fn test_subset_fields_do_not_join() {
        let grouped = group_marks(vec![
            mark(0, &["a", "b"], "rect", None),
            mark(1, &["a"], "rect", None),
        ]);
        assert_eq!(grouped.groups.len(), 2);
    }

    #[test]
    fn test_groups_by_shape_and_axis() {
        let grouped = group_marks(vec![
            mark(0, &["a"], "circle", None),
            mark(1, &["a"], "rect", None),
            mark(2, &["a"], "text", Some("xaxis")),
            mark(3, &["a"], "text", Some("yaxis")),
            mark(4, &["a"], "text", Some("xaxis")),
        ]);
        assert_eq!(grouped.groups.len(), 4);
        assert_eq!(grouped.groups[2].ids, vec![2, 4]);
        assert_eq!(grouped.groups[2].name.as_deref(), Some("xaxis-labels"));
        assert_eq!(grouped.groups[3].name.as_deref(), Some("yaxis-labels"));
    }

    #[test]
    fn test_unbound_marks_dropped() {
        let grouped = group_marks(vec![mark(0, &[], "rect", None), mark(1, &["a"], "rect", None)]);
        assert_eq!(grouped.unbound, vec![0]);
        assert_eq!(grouped.groups.len(), 1);
    }

    #[test]
    fn test_every_mark_in_exactly_one_group() {
        let marks: Vec<Mark> = (0..12)
            .map(|i| {
                let fields: &[&str] = if i % 3 == 0 { &["a"] } else { &["a", "b"] };
                let shape = if i % 2 == 0 { "rect" } else { "circle" };
                mark(i, fields, shape, None)
            })
            .collect();
        let grouped = group_marks(marks);

        let mut seen: Vec<usize> = grouped.groups.iter().flat_map(|g| g.ids.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());

        for group in &grouped.groups {
            let fields = group.field_names();
            for column in group.data.values().chain(group.attrs.values()) {
                assert_eq!(column.len(), group.len());
            }
            let expected: BTreeSet<&str> = if fields.contains("b") {
                ["a", "b", MARK_ID_FIELD].into_iter().collect()
            } else {
                ["a", MARK_ID_FIELD].into_iter().collect()
            };
            assert_eq!(fields, expected);
        }
    }

    #[test]
    fn test_line_index_injected() {
        let mut m = mark(3, &["v"], "linePoint", None);
        m.line_index = Some(4);
        let grouped = group_marks(vec![m]);
        assert_eq!(grouped.groups[0].data[LINE_INDEX_FIELD], vec![Value::Number(4.0)]);
        assert_eq!(grouped.groups[0].data[MARK_ID_FIELD], vec![Value::Number(3.0)]);
    }
}
