//! Repeatable sub-entry rows (floors, residents).
//!
//! Rows are addressed by allocation handles that are never reused within a
//! session; the 1-based number shown next to a row is derived from its
//! position and shifts when an earlier row is removed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CollectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryHandle(u32);

impl EntryHandle {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of [`EntryCollection::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The collection holds a single row, which is kept.
    LastEntryKept,
    NotFound,
}

/// Ordered, never-empty list of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCollection<T>", into = "RawCollection<T>")]
#[serde(bound(
    serialize = "T: Serialize + Clone",
    deserialize = "T: Deserialize<'de>"
))]
pub struct EntryCollection<T> {
    entries: Vec<(EntryHandle, T)>,
    next_handle: u32,
}

impl<T: Default> EntryCollection<T> {
    pub fn new() -> Self {
        Self {
            entries: vec![(EntryHandle(0), T::default())],
            next_handle: 1,
        }
    }

    pub fn add(&mut self) -> EntryHandle {
        let handle = EntryHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, T::default()));
        tracing::debug!(%handle, len = self.entries.len(), "entry added");
        handle
    }

    /// Back to a single empty row; handle allocation restarts.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T: Default> Default for EntryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryCollection<T> {
    pub fn remove(&mut self, handle: EntryHandle) -> Removal {
        let Some(index) = self.index_of(handle) else {
            return Removal::NotFound;
        };
        if self.entries.len() == 1 {
            return Removal::LastEntryKept;
        }
        self.entries.remove(index);
        tracing::debug!(%handle, len = self.entries.len(), "entry removed");
        Removal::Removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&T> {
        self.index_of(handle).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut T> {
        self.index_of(handle).map(|index| &mut self.entries[index].1)
    }

    /// 1-based display number of the row.
    pub fn position(&self, handle: EntryHandle) -> Option<usize> {
        self.index_of(handle).map(|index| index + 1)
    }

    pub fn handles(&self) -> impl Iterator<Item = EntryHandle> + '_ {
        self.entries.iter().map(|(handle, _)| *handle)
    }

    /// Rows in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(_, row)| row)
    }

    pub fn first(&self) -> &T {
        // invariant: never empty
        &self.entries[0].1
    }

    fn index_of(&self, handle: EntryHandle) -> Option<usize> {
        self.entries.iter().position(|(h, _)| *h == handle)
    }
}

#[derive(Serialize, Deserialize)]
struct RawCollection<T> {
    entries: Vec<(EntryHandle, T)>,
    #[serde(default)]
    next_handle: u32,
}

impl<T> TryFrom<RawCollection<T>> for EntryCollection<T> {
    type Error = CollectionError;

    fn try_from(raw: RawCollection<T>) -> Result<Self, Self::Error> {
        if raw.entries.is_empty() {
            return Err(CollectionError::Empty);
        }
        let mut seen: Vec<EntryHandle> = raw.entries.iter().map(|(h, _)| *h).collect();
        seen.sort();
        if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CollectionError::DuplicateHandle { handle: pair[0].0 });
        }
        let highest = seen.last().map_or(0, |h| h.0);
        Ok(Self {
            entries: raw.entries,
            next_handle: raw.next_handle.max(highest + 1),
        })
    }
}

impl<T> From<EntryCollection<T>> for RawCollection<T> {
    fn from(collection: EntryCollection<T>) -> Self {
        Self {
            entries: collection.entries,
            next_handle: collection.next_handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn remove_refuses_the_last_row() {
        let mut rows: EntryCollection<String> = EntryCollection::new();
        let only = rows.handles().next().unwrap();
        assert_eq!(rows.remove(only), Removal::LastEntryKept);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn handles_are_not_reused_after_removal() {
        let mut rows: EntryCollection<String> = EntryCollection::new();
        let a = rows.add();
        let b = rows.add();
        assert_eq!(rows.remove(b), Removal::Removed);
        let c = rows.add();
        assert!(c.value() > b.value());
        assert_eq!(rows.remove(b), Removal::NotFound);
        assert_eq!(rows.position(a), Some(2));
        assert_eq!(rows.position(c), Some(3));
    }

    #[test]
    fn positions_close_up_after_removal() {
        let mut rows: EntryCollection<String> = EntryCollection::new();
        let first = rows.handles().next().unwrap();
        let second = rows.add();
        let third = rows.add();
        *rows.get_mut(third).unwrap() = "third".into();

        rows.remove(second);
        assert_eq!(rows.position(first), Some(1));
        assert_eq!(rows.position(third), Some(2));
        assert_eq!(rows.iter().last().map(String::as_str), Some("third"));
    }

    #[test]
    fn deserialising_restores_handle_allocation() {
        let raw = r#"{"entries":[[4,"a"],[9,"b"]],"next_handle":2}"#;
        let mut rows: EntryCollection<String> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows.add().value(), 10);

        let empty = serde_json::from_str::<EntryCollection<String>>(r#"{"entries":[]}"#);
        assert!(empty.unwrap_err().to_string().contains("at least one row"));
        let duplicated =
            serde_json::from_str::<EntryCollection<String>>(r#"{"entries":[[1,"a"],[1,"b"]]}"#);
        assert!(duplicated.unwrap_err().to_string().contains("duplicate handle 1"));
    }

    proptest! {
        #[test]
        fn never_drops_below_one_row(ops in proptest::collection::vec(any::<(bool, u8)>(), 0..64)) {
            let mut rows: EntryCollection<u8> = EntryCollection::new();
            let mut issued = vec![rows.handles().next().unwrap()];
            for (add, pick) in ops {
                if add {
                    issued.push(rows.add());
                } else {
                    let handle = issued[pick as usize % issued.len()];
                    rows.remove(handle);
                }
                prop_assert!(rows.len() >= 1);
            }
        }
    }
}
