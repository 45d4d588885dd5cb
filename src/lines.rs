// Line expansion: a path bound to an array of data becomes one mark per vertex

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::data::RawMark;
use crate::ir::LINE_POINT_SHAPE;
use crate::normalize::json_type_name;

/// The array a path is bound to, plus the datum's other fields
#[derive(Debug, Clone, PartialEq)]
struct LineData {
    array: Vec<JsonValue>,
    other: Map<String, JsonValue>,
}

/// Replace every eligible path mark by its per-vertex marks.
/// Expanded marks are appended after the untouched ones.
pub fn expand_lines(marks: Vec<RawMark>) -> Vec<RawMark> {
    let mut kept = Vec::with_capacity(marks.len());
    let mut points = Vec::new();

    for mark in marks {
        match line_data(&mark) {
            Some(line) => {
                debug!(id = mark.id, vertices = line.array.len(), "expanding line mark");
                points.extend(line_points(&mark, line));
            }
            None => kept.push(mark),
        }
    }

    kept.extend(points);
    kept
}

/// Coerce `{"0": a, "1": b, "length": 2}` style objects to an array.
/// Keys must be exactly 0..n-1, plus an optional numeric "length" equal to n.
fn array_like(value: &JsonValue) -> Option<Vec<JsonValue>> {
    let obj = value.as_object()?;
    let mut count = 0;
    for (key, v) in obj {
        if key == "length" {
            if v.as_u64().is_none() {
                return None;
            }
        } else if key.parse::<usize>().is_ok() {
            count += 1;
        } else {
            return None;
        }
    }
    if let Some(len) = obj.get("length").and_then(JsonValue::as_u64) {
        if len as usize != count {
            return None;
        }
    }
    (0..count).map(|i| obj.get(&i.to_string()).cloned()).collect()
}

fn as_array(value: &JsonValue) -> Option<Vec<JsonValue>> {
    match value {
        JsonValue::Array(items) => Some(items.clone()),
        other => array_like(other),
    }
}

fn line_data(mark: &RawMark) -> Option<LineData> {
    if mark.shape() != Some("path") {
        return None;
    }
    let vertex_count = mark.vertices.as_ref()?.len();
    let aligned = |array: &[JsonValue]| {
        !array.is_empty() && (vertex_count == array.len() || vertex_count == array.len() + 2)
    };

    if let Some(array) = as_array(&mark.data).filter(|a| aligned(a.as_slice())) {
        return Some(LineData { array, other: Map::new() });
    }

    let obj = mark.data.as_object()?;
    let mut array = None;
    let mut other = Map::new();
    for (field, value) in obj {
        match as_array(value).filter(|a| array.is_none() && aligned(a.as_slice())) {
            Some(found) => array = Some(found),
            None => {
                other.insert(field.clone(), value.clone());
            }
        }
    }

    array.map(|array| LineData { array, other })
}

fn line_points(mark: &RawMark, line: LineData) -> Vec<RawMark> {
    let vertices = mark.vertices.as_deref().unwrap_or_default();
    // Spline paths carry an extra control point at each end
    let positions = if vertices.len() == line.array.len() + 2 {
        &vertices[1..vertices.len() - 1]
    } else {
        vertices
    };

    line.array
        .into_iter()
        .zip(positions)
        .enumerate()
        .map(|(j, (item, [x, y]))| {
            let mut data = match item {
                JsonValue::Object(fields) => fields,
                scalar => {
                    let mut fields = Map::new();
                    fields.insert(json_type_name(&scalar).to_string(), scalar);
                    fields
                }
            };
            for (k, v) in &line.other {
                data.insert(k.clone(), v.clone());
            }

            let mut attrs = mark.attrs.clone();
            attrs.insert("x".to_string(), JsonValue::from(*x));
            attrs.insert("y".to_string(), JsonValue::from(*y));
            attrs.insert("shape".to_string(), JsonValue::from(LINE_POINT_SHAPE));

            RawMark {
                id: mark.id,
                data: JsonValue::Object(data),
                attrs,
                node_attrs: mark.node_attrs.clone(),
                axis: mark.axis.clone(),
                vertices: None,
                line_index: Some(j),
            }
        })
        .collect()
}
