//! Content values and selection paths.

use crate::error::EngineError;
use kurbo::Point;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// One drawable/editable entity in the store.
///
/// A content is an immutable JSON object carrying a required `"type"` tag,
/// shape-specific fields, and the optional common fields `"z"`,
/// `"visible"`, and `"readonly"`. Mutation always replaces the whole value,
/// so two contents are "the same" exactly when they share an allocation —
/// that pointer identity is what the geometry cache keys on.
#[derive(Debug, Clone)]
pub struct Content {
    value: Arc<Value>,
}

impl Content {
    /// Wrap a JSON object as content. The value must be an object with a
    /// string `type` field.
    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        match value.get("type") {
            Some(Value::String(_)) => Ok(Self {
                value: Arc::new(value),
            }),
            Some(_) => Err(EngineError::MalformedContent(
                "`type` tag must be a string".into(),
            )),
            None => Err(EngineError::MalformedContent(
                "content object has no `type` tag".into(),
            )),
        }
    }

    /// Wrap an object literal known to carry a `type` tag (used by the
    /// leaf model constructors, whose literals always do).
    pub(crate) fn from_tagged(value: Value) -> Self {
        debug_assert!(matches!(value.get("type"), Some(Value::String(_))));
        Self {
            value: Arc::new(value),
        }
    }

    /// The type tag used for registry lookup.
    pub fn type_tag(&self) -> &str {
        self.value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Read a field of the underlying object.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// The full JSON value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Allocation identity, used as the geometry cache key.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.value) as usize
    }

    /// Explicit draw-order override, if any.
    pub fn z(&self) -> Option<f64> {
        self.get("z").and_then(Value::as_f64)
    }

    /// Whether the content participates in hit-testing and rendering.
    pub fn visible(&self) -> bool {
        self.get("visible").and_then(Value::as_bool).unwrap_or(true)
    }

    /// Whether destructive commands must leave the content alone.
    pub fn readonly(&self) -> bool {
        self.get("readonly")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Produce a new content with the object mutated by `edit`.
    ///
    /// The original is untouched; the result is a fresh allocation, so
    /// identity-based caches see it as changed.
    pub fn edit(&self, edit: impl FnOnce(&mut Map<String, Value>)) -> Self {
        let mut value = (*self.value).clone();
        if let Value::Object(map) = &mut value {
            edit(map);
        }
        Self {
            value: Arc::new(value),
        }
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value) || self.value == other.value
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Content::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// A selection target: a whole content, or one sub-feature of it (e.g. a
/// single segment of a polyline). Used uniformly for selection, hover, and
/// in-place point editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPath {
    /// Slot index in the content store.
    pub index: usize,
    /// Sub-feature index, when a part is addressed instead of the whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<usize>,
}

impl SelectionPath {
    /// Address a whole content.
    pub fn whole(index: usize) -> Self {
        Self { index, part: None }
    }

    /// Address one sub-feature of a content.
    pub fn part(index: usize, part: usize) -> Self {
        Self {
            index,
            part: Some(part),
        }
    }
}

/// Read a `{ "x": .., "y": .. }` object as a point.
pub fn point_from(value: &Value) -> Option<Point> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some(Point::new(x, y))
}

/// Encode a point as a `{ "x": .., "y": .. }` object.
pub fn point_to(point: Point) -> Value {
    json!({ "x": point.x, "y": point.y })
}

/// Read an array field of points.
pub fn points_from(value: &Value) -> Option<Vec<Point>> {
    value.as_array()?.iter().map(point_from).collect()
}

/// Encode a list of points as a JSON array.
pub fn points_to(points: &[Point]) -> Value {
    Value::Array(points.iter().map(|p| point_to(*p)).collect())
}
