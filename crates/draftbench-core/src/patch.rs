//! Forward/inverse patches describing content store transitions.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// One step of a patch path: an index into the store or an array field, or
/// a named object field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSeg {
    Index(usize),
    Field(String),
}

impl PathSeg {
    pub fn field(name: &str) -> Self {
        PathSeg::Field(name.to_string())
    }
}

/// A minimal, invertible description of one state transition.
///
/// The first path segment addresses the store: an index selects a slot, the
/// field `"length"` addresses the store's slot count itself. Deeper
/// segments address fields inside a slot's content value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub path: Vec<PathSeg>,
    pub op: PatchOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn add(path: Vec<PathSeg>, value: Value) -> Self {
        Self {
            path,
            op: PatchOp::Add,
            value: Some(value),
        }
    }

    pub fn replace(path: Vec<PathSeg>, value: Value) -> Self {
        Self {
            path,
            op: PatchOp::Replace,
            value: Some(value),
        }
    }

    pub fn remove(path: Vec<PathSeg>) -> Self {
        Self {
            path,
            op: PatchOp::Remove,
            value: None,
        }
    }

    /// A store truncation/extension patch.
    pub fn set_length(len: usize) -> Self {
        Self::replace(vec![PathSeg::field("length")], Value::from(len))
    }

    /// Whether this patch addresses the store's length.
    pub fn is_length(&self) -> bool {
        matches!(self.path.first(), Some(PathSeg::Field(f)) if f == "length")
    }

    /// The slot index this patch addresses, if it addresses one.
    pub fn slot(&self) -> Option<usize> {
        match self.path.first() {
            Some(PathSeg::Index(i)) => Some(*i),
            _ => None,
        }
    }

    /// The requested length of a length patch.
    pub fn length_value(&self) -> Result<usize, EngineError> {
        self.value
            .as_ref()
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| EngineError::MalformedPatch("length patch without a count".into()))
    }
}

/// Read a nested value at `path` inside a JSON value.
pub fn read_at<'v>(root: &'v Value, path: &[PathSeg]) -> Option<&'v Value> {
    let mut cur = root;
    for seg in path {
        cur = match seg {
            PathSeg::Field(f) => cur.get(f.as_str())?,
            PathSeg::Index(i) => cur.get(*i)?,
        };
    }
    Some(cur)
}

/// Apply one operation at `path` inside a JSON value.
///
/// Object `add` inserts or overwrites a key; array `add` inserts at the
/// index, shifting later elements (content-local arrays have no external
/// index references, unlike store slots).
pub fn apply_at(
    root: &mut Value,
    path: &[PathSeg],
    op: PatchOp,
    value: Option<&Value>,
) -> Result<(), EngineError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(EngineError::MalformedPatch("empty patch path".into()));
    };
    let mut cur = root;
    for seg in parents {
        cur = match seg {
            PathSeg::Field(f) => cur
                .get_mut(f.as_str())
                .ok_or_else(|| EngineError::MalformedPatch(format!("no field `{f}`")))?,
            PathSeg::Index(i) => cur
                .get_mut(*i)
                .ok_or_else(|| EngineError::MalformedPatch(format!("no element {i}")))?,
        };
    }
    match (last, op) {
        (PathSeg::Field(f), PatchOp::Add | PatchOp::Replace) => {
            let v = value
                .cloned()
                .ok_or_else(|| EngineError::MalformedPatch("add/replace without value".into()))?;
            cur.as_object_mut()
                .ok_or_else(|| EngineError::MalformedPatch(format!("`{f}` parent not an object")))?
                .insert(f.clone(), v);
        }
        (PathSeg::Field(f), PatchOp::Remove) => {
            cur.as_object_mut()
                .ok_or_else(|| EngineError::MalformedPatch(format!("`{f}` parent not an object")))?
                .remove(f);
        }
        (PathSeg::Index(i), op) => {
            let arr = cur
                .as_array_mut()
                .ok_or_else(|| EngineError::MalformedPatch(format!("element {i} parent not an array")))?;
            match op {
                PatchOp::Add => {
                    let v = value.cloned().ok_or_else(|| {
                        EngineError::MalformedPatch("add without value".into())
                    })?;
                    if *i > arr.len() {
                        return Err(EngineError::MalformedPatch(format!(
                            "add at {i} past array length {}",
                            arr.len()
                        )));
                    }
                    arr.insert(*i, v);
                }
                PatchOp::Replace => {
                    let v = value.cloned().ok_or_else(|| {
                        EngineError::MalformedPatch("replace without value".into())
                    })?;
                    let slot = arr.get_mut(*i).ok_or_else(|| {
                        EngineError::MalformedPatch(format!("no element {i}"))
                    })?;
                    *slot = v;
                }
                PatchOp::Remove => {
                    if *i >= arr.len() {
                        return Err(EngineError::MalformedPatch(format!("no element {i}")));
                    }
                    arr.remove(*i);
                }
            }
        }
    }
    Ok(())
}
