use serde::{Deserialize, Serialize};

/// A single typed field value.
///
/// Deliberately minimal: the full type system of the table layer lives
/// above this crate. The mutation session only needs values it can encode,
/// compare, and move around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A row: positional fields in schema column order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<RowValue>,
}

impl Row {
    /// Create a row from fields in column order.
    pub fn new(fields: Vec<RowValue>) -> Self {
        Self { fields }
    }

    /// All fields in column order.
    pub fn fields(&self) -> &[RowValue] {
        &self.fields
    }

    /// The field at column index `i`, if present.
    pub fn field(&self, i: usize) -> Option<&RowValue> {
        self.fields.get(i)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
