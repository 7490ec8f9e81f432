//! Forward-only tabular cursor contract and an in-memory implementation.

use crate::{error::BoxError, schema::RowSchema, types::TypeRef, value::Value};
use std::any::{TypeId, type_name};

///
/// RowCursor
///
/// A forward-only, column-indexed source positioned on one row at a time.
/// Within a row, columns must be read at most once and in non-decreasing
/// index order; compiled routines only touch a cursor through the scheduler.
///

pub trait RowCursor {
    fn column_count(&self) -> usize;

    fn column_name(&self, index: usize) -> &str;

    fn column_type(&self, index: usize) -> TypeRef;

    /// Whether the column holds null on the current row. Does not consume it.
    fn is_null(&mut self, index: usize) -> Result<bool, BoxError>;

    /// Read the column on the current row as `as_type`.
    fn read_column(&mut self, index: usize, as_type: &TypeRef) -> Result<Value, BoxError>;
}

///
/// ReaderShape
///
/// Identity of a cursor implementation; the first routine cache key component.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ReaderShape {
    id: TypeId,
    name: &'static str,
}

impl ReaderShape {
    #[must_use]
    pub fn of<C: RowCursor + ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

///
/// MemoryCursor
///
/// In-memory rows behind the `RowCursor` contract. Rejects reads that move
/// backwards or repeat a column, and records every physical read so tests
/// can check access order.
///

#[derive(Clone, Debug)]
pub struct MemoryCursor {
    schema: RowSchema,
    rows: Vec<Vec<Value>>,
    row: Option<usize>,
    next_column: usize,
    reads: Vec<usize>,
}

impl MemoryCursor {
    #[must_use]
    pub const fn new(schema: RowSchema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            row: None,
            next_column: 0,
            reads: Vec::new(),
        }
    }

    /// Position on the next row; returns false once the rows are exhausted.
    pub fn advance(&mut self) -> bool {
        let next = self.row.map_or(0, |row| row + 1);
        self.next_column = 0;
        self.reads.clear();

        if next < self.rows.len() {
            self.row = Some(next);
            true
        } else {
            self.row = Some(self.rows.len());
            false
        }
    }

    /// Column indices physically read on the current row, in read order.
    #[must_use]
    pub fn reads(&self) -> &[usize] {
        &self.reads
    }

    #[must_use]
    pub const fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn cell(&self, index: usize) -> Result<&Value, BoxError> {
        if index >= self.schema.len() {
            return Err(format!("column {index} is out of range").into());
        }
        if index < self.next_column {
            return Err(format!(
                "column {index} was requested after column {} had already been read",
                self.next_column - 1
            )
            .into());
        }

        let row = self
            .row
            .and_then(|row| self.rows.get(row))
            .ok_or("cursor is not positioned on a row")?;

        row.get(index)
            .ok_or_else(|| format!("row has no value for column {index}").into())
    }
}

impl RowCursor for MemoryCursor {
    fn column_count(&self) -> usize {
        self.schema.len()
    }

    fn column_name(&self, index: usize) -> &str {
        &self.schema[index].name
    }

    fn column_type(&self, index: usize) -> TypeRef {
        self.schema[index].ty.clone()
    }

    fn is_null(&mut self, index: usize) -> Result<bool, BoxError> {
        let is_null = self.cell(index)?.is_null();
        self.next_column = index;

        Ok(is_null)
    }

    fn read_column(&mut self, index: usize, as_type: &TypeRef) -> Result<Value, BoxError> {
        let value = self.cell(index)?.clone();
        self.next_column = index + 1;
        self.reads.push(index);

        if value.matches_type(as_type) {
            Ok(value)
        } else {
            Err(format!(
                "cannot read column {} as {as_type}; it holds {value}",
                self.schema[index]
            )
            .into())
        }
    }
}
