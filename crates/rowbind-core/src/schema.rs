//! Result-set shape: the ordered, typed columns a routine is compiled against.

use crate::{cursor::RowCursor, types::TypeRef, value::casefold};
use derive_more::{Deref, Display};
use std::{
    hash::{Hash, Hasher},
    ops::Range,
    sync::Arc,
};
use xxhash_rust::xxh3::Xxh3;

///
/// Column
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{index} ({ty} {name})")]
pub struct Column {
    pub index: usize,
    pub name: String,
    pub ty: TypeRef,
}

///
/// RowSchema
///
/// Immutable ordered column list with contiguous indices from 0. Equality is
/// structural; the precomputed fingerprint only speeds up hashing.
///

#[derive(Clone, Debug, Deref)]
pub struct RowSchema {
    #[deref(forward)]
    columns: Arc<[Column]>,
    fingerprint: u64,
}

impl RowSchema {
    pub fn new<N: Into<String>>(columns: impl IntoIterator<Item = (N, TypeRef)>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(index, (name, ty))| Column {
                index,
                name: name.into(),
                ty,
            })
            .collect::<Arc<[Column]>>();
        let fingerprint = fingerprint(&columns);

        Self {
            columns,
            fingerprint,
        }
    }

    /// Snapshot the column metadata a cursor reports.
    pub fn from_cursor(cursor: &(impl RowCursor + ?Sized)) -> Self {
        Self::new((0..cursor.column_count()).map(|index| {
            (
                cursor.column_name(index).to_string(),
                cursor.column_type(index),
            )
        }))
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Columns inside `range` whose name starts with `prefix`, compared
    /// case-insensitively, paired with the name left after the prefix.
    #[must_use]
    pub fn columns_with_prefix(&self, prefix: &str, range: Range<usize>) -> Vec<(String, &Column)> {
        let end = range.end.min(self.columns.len());
        let start = range.start.min(end);
        let folded_prefix = casefold(prefix);

        self.columns[start..end]
            .iter()
            .filter_map(|column| {
                let head = column.name.get(..prefix.len())?;
                (casefold(head) == folded_prefix)
                    .then(|| (column.name[prefix.len()..].to_string(), column))
            })
            .collect()
    }
}

fn fingerprint(columns: &[Column]) -> u64 {
    let mut hasher = Xxh3::new();
    for column in columns {
        hasher.update(&column.index.to_le_bytes());
        hasher.update(column.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(column.ty.to_string().as_bytes());
        hasher.update(&[0]);
    }

    hasher.digest()
}

impl PartialEq for RowSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.columns == other.columns
    }
}

impl Eq for RowSchema {}

impl Hash for RowSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    fn schema() -> RowSchema {
        RowSchema::new([
            ("Id", TypeRef::Scalar(ScalarKind::I32)),
            ("addr_Street", TypeRef::Scalar(ScalarKind::Text)),
            ("ADDR_City", TypeRef::Scalar(ScalarKind::Text)),
            ("addrs", TypeRef::Scalar(ScalarKind::Text)),
        ])
    }

    #[test]
    fn columns_are_indexed_contiguously() {
        let schema = schema();
        let indices = schema.iter().map(|c| c.index).collect::<Vec<_>>();

        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(schema[1].to_string(), "1 (string addr_Street)");
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(schema(), schema());

        let other = RowSchema::new([("Id", TypeRef::Scalar(ScalarKind::I64))]);
        assert_ne!(schema(), other);
        assert_ne!(schema().fingerprint(), other.fingerprint());
    }

    #[test]
    fn prefix_selection_is_case_insensitive_and_strips_prefix() {
        let schema = schema();
        let selected = schema
            .columns_with_prefix("addr_", 0..schema.len())
            .into_iter()
            .map(|(name, column)| (name, column.index))
            .collect::<Vec<_>>();

        assert_eq!(
            selected,
            vec![("Street".to_string(), 1), ("City".to_string(), 2)]
        );
    }

    #[test]
    fn prefix_selection_respects_range() {
        let schema = schema();
        let selected = schema.columns_with_prefix("", 2..10);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].1.index, 2);
    }
}
