// Type normalization: extracted values arrive as JSON scalars or strings and are
// coerced per field to number, color or text by a vote across all marks.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::trace;

use crate::data::RawMark;
use crate::ir::{Mark, Record, Value};
use crate::parser::{parse_color, parse_number};

/// Attribute that always stays textual even when it looks numeric
const TEXT_ATTR: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    Color,
    Text,
}

fn classify(value: &JsonValue, allow_number: bool) -> FieldType {
    match value {
        JsonValue::Number(n) if allow_number && n.as_f64().is_some_and(f64::is_finite) => {
            FieldType::Number
        }
        JsonValue::String(s) if allow_number && parse_number(s).is_some() => FieldType::Number,
        JsonValue::String(s) if parse_color(s).is_some() => FieldType::Color,
        _ => FieldType::Text,
    }
}

/// Decide one type per field. A field keeps the type of its first value only
/// while every later value agrees; any disagreement demotes it to text.
pub fn vote_field_types<'a, I>(records: I, text_field: Option<&str>) -> BTreeMap<String, FieldType>
where
    I: IntoIterator<Item = &'a BTreeMap<String, JsonValue>>,
{
    let mut types: BTreeMap<String, FieldType> = BTreeMap::new();
    for record in records {
        for (field, value) in record {
            let observed = classify(value, text_field != Some(field.as_str()));
            types
                .entry(field.clone())
                .and_modify(|t| {
                    if *t != observed {
                        *t = FieldType::Text;
                    }
                })
                .or_insert(observed);
        }
    }
    types
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a raw value to the voted type, falling back to text
pub fn coerce(value: &JsonValue, ty: FieldType) -> Value {
    let coerced = match (ty, value) {
        (FieldType::Number, JsonValue::Number(n)) => n.as_f64().map(Value::Number),
        (FieldType::Number, JsonValue::String(s)) => parse_number(s).map(Value::Number),
        (FieldType::Color, JsonValue::String(s)) => parse_color(s).map(Value::Color),
        _ => None,
    };
    coerced.unwrap_or_else(|| Value::Text(as_text(value)))
}

/// Flatten a mark's bound datum into a field record. Scalars are keyed by
/// their JSON type name; arrays by element index; null means unbound.
pub fn data_record(data: &JsonValue) -> BTreeMap<String, JsonValue> {
    match data {
        JsonValue::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        JsonValue::Null => BTreeMap::new(),
        scalar => BTreeMap::from([(json_type_name(scalar).to_string(), scalar.clone())]),
    }
}

pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) | JsonValue::Object(_) => "object",
    }
}

fn apply_types(record: &BTreeMap<String, JsonValue>, types: &BTreeMap<String, FieldType>) -> Record {
    record
        .iter()
        .map(|(field, value)| {
            let ty = types.get(field).copied().unwrap_or(FieldType::Text);
            (field.clone(), coerce(value, ty))
        })
        .collect()
}

/// Type every mark's data and attribute records
pub fn normalize_marks(marks: Vec<RawMark>) -> Vec<Mark> {
    let data: Vec<BTreeMap<String, JsonValue>> = marks.iter().map(|m| data_record(&m.data)).collect();

    let data_types = vote_field_types(&data, None);
    let attr_types = vote_field_types(marks.iter().map(|m| &m.attrs), Some(TEXT_ATTR));
    trace!(?data_types, ?attr_types, "voted field types");

    marks
        .into_iter()
        .zip(data)
        .map(|(raw, record)| Mark {
            id: raw.id,
            data: apply_types(&record, &data_types),
            attrs: apply_types(&raw.attrs, &attr_types),
            node_attrs: raw.node_attrs,
            axis: raw.axis,
            line_index: raw.line_index,
        })
        .collect()
}
