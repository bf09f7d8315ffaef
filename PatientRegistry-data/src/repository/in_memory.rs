use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::errors::RepositoryError;

/// In-memory table keyed by record id, kept in insertion order.
///
/// Clones share the same underlying map, so a repository can be handed to
/// several services and they all see the same rows. Uniqueness checks run
/// under the same lock as the write they guard.
#[derive(Debug)]
pub struct InMemoryStorage<T> {
    rows: Arc<Mutex<IndexMap<Uuid, T>>>,
}

impl<T> Clone for InMemoryStorage<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T: Clone> Default for InMemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> InMemoryStorage<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Insert a row unless `conflict` reports a clash with an existing row
    pub fn insert_unique<F>(&self, id: Uuid, row: T, conflict: F) -> Result<T, RepositoryError>
    where
        F: Fn(&T) -> Option<RepositoryError>,
    {
        let mut rows = self.rows.lock()?;
        if let Some(err) = rows.values().find_map(&conflict) {
            return Err(err);
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    /// Replace an existing row. Returns `None` when the id is unknown.
    /// `conflict` is only checked against the other rows.
    pub fn replace_unique<F>(&self, id: Uuid, row: T, conflict: F) -> Result<Option<T>, RepositoryError>
    where
        F: Fn(&T) -> Option<RepositoryError>,
    {
        let mut rows = self.rows.lock()?;
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(err) = rows
            .iter()
            .filter(|(key, _)| **key != id)
            .find_map(|(_, existing)| conflict(existing))
        {
            return Err(err);
        }
        // Replacing an existing key keeps its position
        rows.insert(id, row.clone());
        Ok(Some(row))
    }

    /// Fetch a row by id
    pub fn get(&self, id: &Uuid) -> Result<Option<T>, RepositoryError> {
        let rows = self.rows.lock()?;
        Ok(rows.get(id).cloned())
    }

    /// Fetch the first row matching a predicate
    pub fn find<P>(&self, predicate: P) -> Result<Option<T>, RepositoryError>
    where
        P: Fn(&T) -> bool,
    {
        let rows = self.rows.lock()?;
        Ok(rows.values().find(|row| predicate(row)).cloned())
    }

    /// Remove a row, reporting whether it existed
    pub fn remove(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock()?;
        Ok(rows.shift_remove(id).is_some())
    }

    /// Snapshot of every row in insertion order
    pub fn all(&self) -> Result<Vec<T>, RepositoryError> {
        let rows = self.rows.lock()?;
        Ok(rows.values().cloned().collect())
    }

    /// Number of stored rows
    pub fn count(&self) -> Result<usize, RepositoryError> {
        let rows = self.rows.lock()?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_conflict(_: &String) -> Option<RepositoryError> {
        None
    }

    #[test]
    fn test_clones_share_rows() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        let clone = storage.clone();

        let id = Uuid::new_v4();
        storage.insert_unique(id, "first".to_string(), no_conflict).unwrap();

        assert_eq!(clone.get(&id).unwrap(), Some("first".to_string()));
        assert_eq!(clone.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_rejects_conflict() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        storage.insert_unique(Uuid::new_v4(), "taken".to_string(), no_conflict).unwrap();

        let result = storage.insert_unique(Uuid::new_v4(), "taken".to_string(), |existing| {
            (existing == "taken").then(|| RepositoryError::conflict("value", "taken"))
        });

        assert_eq!(result, Err(RepositoryError::conflict("value", "taken")));
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_replace_ignores_own_row() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        let id = Uuid::new_v4();
        storage.insert_unique(id, "same".to_string(), no_conflict).unwrap();

        let replaced = storage
            .replace_unique(id, "same".to_string(), |existing| {
                (existing == "same").then(|| RepositoryError::conflict("value", "same"))
            })
            .unwrap();

        assert_eq!(replaced, Some("same".to_string()));
    }

    #[test]
    fn test_replace_unknown_id() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        let replaced = storage.replace_unique(Uuid::new_v4(), "x".to_string(), no_conflict).unwrap();
        assert!(replaced.is_none());
    }

    #[test]
    fn test_all_keeps_insertion_order() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            storage.insert_unique(*id, format!("row {}", i), no_conflict).unwrap();
        }
        storage.remove(&ids[1]).unwrap();
        storage.replace_unique(ids[3], "row 3 updated".to_string(), no_conflict).unwrap();

        assert_eq!(
            storage.all().unwrap(),
            vec!["row 0", "row 2", "row 3 updated", "row 4"]
        );
    }

    #[test]
    fn test_remove() {
        let storage: InMemoryStorage<String> = InMemoryStorage::new();
        let id = Uuid::new_v4();
        storage.insert_unique(id, "row".to_string(), no_conflict).unwrap();

        assert!(storage.remove(&id).unwrap());
        assert!(!storage.remove(&id).unwrap());
        assert_eq!(storage.count().unwrap(), 0);
    }
}
