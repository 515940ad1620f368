//! Search paths: ordered directory lists supplied per target, interned by
//! value so equal lists share cached resolutions.

use crate::canon::canon_path;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// An ordered list of canonical directories.  Equality is by value and
/// order-sensitive: the same directories in another order can resolve a
/// name to a different file.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct SearchPath(Arc<[String]>);

impl SearchPath {
    pub fn new<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SearchPath(dirs.into_iter().map(canon_path).collect())
    }

    pub fn dirs(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, dir) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", dir)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SearchPathId(u32);

#[derive(Default)]
pub struct SearchPaths {
    paths: Vec<SearchPath>,
    ids: FxHashMap<SearchPath, SearchPathId>,
}

impl SearchPaths {
    pub fn intern(&mut self, path: SearchPath) -> SearchPathId {
        if let Some(&id) = self.ids.get(&path) {
            return id;
        }
        let id = SearchPathId(self.paths.len() as u32);
        self.paths.push(path.clone());
        self.ids.insert(path, id);
        id
    }

    pub fn get(&self, id: SearchPathId) -> &SearchPath {
        &self.paths[id.0 as usize]
    }
}
