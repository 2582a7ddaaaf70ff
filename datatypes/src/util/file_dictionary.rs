use std::collections::HashMap;

use snafu::OptionExt;

use crate::error;
use crate::util::Result;

/// Bidirectional map between raster file paths and numeric file ids.
///
/// Ids are assigned monotonically in insertion order. A path added twice keeps its first id.
#[derive(Debug, Default, Clone)]
pub struct FileDictionary {
    paths: Vec<String>,
    ids: HashMap<String, u64>,
}

impl FileDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `path`, adding it if it is not yet known.
    pub fn add(&mut self, path: &str) -> u64 {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }

        let id = self.paths.len() as u64;
        self.paths.push(path.to_owned());
        self.ids.insert(path.to_owned(), id);
        id
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.paths.get(index))
            .map(String::as_str)
    }

    /// Like [`FileDictionary::get`] but fails for unknown ids.
    pub fn path(&self, id: u64) -> Result<&str> {
        self.get(id).context(error::UnknownFileId { id })
    }

    pub fn id_of(&self, path: &str) -> Option<u64> {
        self.ids.get(path).copied()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.paths
            .iter()
            .enumerate()
            .map(|(id, path)| (id as u64, path.as_str()))
    }
}
