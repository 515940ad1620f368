//! Maps file name suffixes to the content scanner for that language.

use crate::include::{CScanner, FortranScanner, IncludeScanner};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScannerId(usize);

/// Whether suffixes differ only by case refer to the same language.
/// Mirrors the filesystem: ".C" is C++ on Unix but plain ".c" on Windows.
const FOLD_CASE: bool = cfg!(windows);

const C_SUFFIXES: &[&str] = &[
    ".c", ".h", ".cc", ".hh", ".cpp", ".hpp", ".cxx", ".hxx", ".c++", ".C++", ".ipp", ".inl",
];
const CASE_SENSITIVE_C_SUFFIXES: &[&str] = &[".C", ".H"];
const FORTRAN_SUFFIXES: &[&str] = &[".f", ".F", ".for", ".FOR", ".f90", ".F90", ".fpp", ".FPP"];

/// The set of known scanners.  Built explicitly and handed to the scan
/// driver; there is no process-wide registry.
pub struct ScannerRegistry {
    scanners: Vec<Arc<dyn IncludeScanner>>,
    suffixes: FxHashMap<String, ScannerId>,
    fold_case: bool,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        ScannerRegistry {
            scanners: Vec::new(),
            suffixes: FxHashMap::default(),
            fold_case: FOLD_CASE,
        }
    }

    /// A registry with the built-in C/C++ and Fortran scanners.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let c = registry.register(Arc::new(CScanner::new()), C_SUFFIXES);
        if !registry.fold_case {
            registry.add_suffixes(c, CASE_SENSITIVE_C_SUFFIXES);
        }
        registry.register(Arc::new(FortranScanner::new()), FORTRAN_SUFFIXES);
        registry
    }

    fn key(&self, suffix: &str) -> String {
        if self.fold_case {
            suffix.to_lowercase()
        } else {
            suffix.to_owned()
        }
    }

    /// Add a scanner, claiming the given suffixes (including the leading
    /// dot).  A suffix already claimed moves to the new scanner.
    pub fn register(&mut self, scanner: Arc<dyn IncludeScanner>, suffixes: &[&str]) -> ScannerId {
        let id = ScannerId(self.scanners.len());
        self.scanners.push(scanner);
        self.add_suffixes(id, suffixes);
        id
    }

    pub fn add_suffixes(&mut self, id: ScannerId, suffixes: &[&str]) {
        for suffix in suffixes {
            let key = self.key(suffix);
            self.suffixes.insert(key, id);
        }
    }

    pub fn get(&self, id: ScannerId) -> &dyn IncludeScanner {
        self.scanners[id.0].as_ref()
    }

    /// The scanner registered for the suffix of a file's base name, if any.
    pub fn for_path(&self, path: &str) -> Option<ScannerId> {
        let base = match path.rfind(['/', '\\']) {
            Some(ofs) => &path[ofs + 1..],
            None => path,
        };
        let dot = base.rfind('.')?;
        self.suffixes.get(&self.key(&base[dot..])).copied()
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
