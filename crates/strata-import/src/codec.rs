//! Default tuple codec: bincode over positional fields.

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::row::{Row, RowValue};
use crate::traits::Schema;

/// A [`Schema`] over positional columns with bincode tuple encoding.
///
/// Primary-key fields are encoded (in declared key order) as the map key;
/// the remaining fields, in column order, form the map value. The layers
/// above substitute their own schema model through the trait; this codec
/// is the default used by tests and simple embedders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleCodec {
    column_count: usize,
    pk_columns: Vec<usize>,
}

impl TupleCodec {
    /// Define a codec over `column_count` columns with the given
    /// primary-key column indices.
    pub fn new(column_count: usize, pk_columns: Vec<usize>) -> ImportResult<Self> {
        for &i in &pk_columns {
            if i >= column_count {
                return Err(ImportError::InvalidSchema(format!(
                    "key column {i} out of range for {column_count} columns"
                )));
            }
        }
        let mut seen = pk_columns.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != pk_columns.len() {
            return Err(ImportError::InvalidSchema(
                "duplicate key column".to_string(),
            ));
        }
        Ok(Self {
            column_count,
            pk_columns,
        })
    }

    /// Number of columns in the schema.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    fn check_width(&self, row: &Row) -> ImportResult<()> {
        if row.len() != self.column_count {
            return Err(ImportError::Codec(format!(
                "row has {} fields, schema has {} columns",
                row.len(),
                self.column_count
            )));
        }
        Ok(())
    }

    fn is_pk(&self, column: usize) -> bool {
        self.pk_columns.contains(&column)
    }
}

impl Schema for TupleCodec {
    fn pk_column_count(&self) -> usize {
        self.pk_columns.len()
    }

    fn primary_key(&self, row: &Row) -> ImportResult<Vec<u8>> {
        self.check_width(row)?;
        let mut key_fields = Vec::with_capacity(self.pk_columns.len());
        for &i in &self.pk_columns {
            // Width was checked above; indexing by a validated column is
            // safe.
            key_fields.push(row.field(i).cloned().ok_or_else(|| {
                ImportError::Codec(format!("missing key column {i}"))
            })?);
        }
        bincode::serialize(&key_fields).map_err(|e| ImportError::Codec(e.to_string()))
    }

    fn encode_row(&self, row: &Row) -> ImportResult<Vec<u8>> {
        self.check_width(row)?;
        let value_fields: Vec<&RowValue> = row
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_pk(*i))
            .map(|(_, f)| f)
            .collect();
        bincode::serialize(&value_fields).map_err(|e| ImportError::Codec(e.to_string()))
    }

    fn decode_row(&self, key: &[u8], value: &[u8]) -> ImportResult<Row> {
        let key_fields: Vec<RowValue> =
            bincode::deserialize(key).map_err(|e| ImportError::Codec(e.to_string()))?;
        let value_fields: Vec<RowValue> =
            bincode::deserialize(value).map_err(|e| ImportError::Codec(e.to_string()))?;
        if key_fields.len() != self.pk_columns.len()
            || key_fields.len() + value_fields.len() != self.column_count
        {
            return Err(ImportError::Codec(format!(
                "stored row has {} key and {} value fields, schema expects {} columns",
                key_fields.len(),
                value_fields.len(),
                self.column_count
            )));
        }

        let mut values = value_fields.into_iter();
        let mut fields = Vec::with_capacity(self.column_count);
        for column in 0..self.column_count {
            // Key fields are stored in declared key order, not column
            // order; look the column up by its position in the key.
            let field = match self.pk_columns.iter().position(|&c| c == column) {
                Some(pos) => key_fields[pos].clone(),
                None => values.next().ok_or_else(|| {
                    ImportError::Codec("stored row shorter than schema".to_string())
                })?,
            };
            fields.push(field);
        }
        Ok(Row::new(fields))
    }

    fn rows_equal(&self, a: &Row, b: &Row) -> bool {
        a == b
    }
}
