//! Locating included files along an ordered list of directories.

use crate::canon::{canon_path, is_absolute, join};
use crate::fs::FileSystem;
use tracing::debug;

/// Which directories a reference is looked up in, and in what order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SearchOrder {
    /// The includer's own directory, then the configured directories.
    IncluderFirst,
    /// Only the configured directories.
    ConfiguredOnly,
}

fn is_file(fs: &dyn FileSystem, path: &str) -> bool {
    match fs.stat(path) {
        Ok(stat) => stat.is_file(),
        Err(err) => {
            debug!("stat {}: {}", path, err);
            false
        }
    }
}

/// Find the first existing file called `name`, trying `origin` (for
/// `SearchOrder::IncluderFirst`) and then each of `dirs` in order.  When the
/// same name exists in several directories the earliest one wins, as with a
/// compiler's -I list.
///
/// Returns the canonical path of the match, or None; a missing file is not an
/// error here, the caller decides how to report it.
pub fn resolve(
    fs: &dyn FileSystem,
    name: &str,
    order: SearchOrder,
    dirs: &[String],
    origin: &str,
) -> Option<String> {
    if is_absolute(name) {
        let path = canon_path(name);
        return if is_file(fs, &path) { Some(path) } else { None };
    }
    let origin = match order {
        SearchOrder::IncluderFirst => Some(origin),
        SearchOrder::ConfiguredOnly => None,
    };
    origin
        .into_iter()
        .chain(dirs.iter().map(String::as_str))
        .map(|dir| join(dir, name))
        .find(|path| is_file(fs, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn dirs(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn first_dir_wins() {
        let mut fs = MemoryFileSystem::new();
        fs.add("d1/x", "");
        fs.add("d2/x", "");
        let path = resolve(&fs, "x", SearchOrder::ConfiguredOnly, &dirs(&["d1", "d2"]), "");
        assert_eq!(path.as_deref(), Some("d1/x"));
        let path = resolve(&fs, "x", SearchOrder::ConfiguredOnly, &dirs(&["d2", "d1"]), "");
        assert_eq!(path.as_deref(), Some("d2/x"));
    }

    #[test]
    fn includer_dir_first() {
        let mut fs = MemoryFileSystem::new();
        fs.add("src/inc.h", "");
        fs.add("lib/inc.h", "");
        let lib = dirs(&["lib"]);
        assert_eq!(
            resolve(&fs, "inc.h", SearchOrder::IncluderFirst, &lib, "src").as_deref(),
            Some("src/inc.h")
        );
        assert_eq!(
            resolve(&fs, "inc.h", SearchOrder::ConfiguredOnly, &lib, "src").as_deref(),
            Some("lib/inc.h")
        );
    }

    #[test]
    fn missing_and_directories() {
        let mut fs = MemoryFileSystem::new();
        fs.add("a/sub/y.h", "");
        let search = dirs(&["a"]);
        assert_eq!(resolve(&fs, "sub", SearchOrder::ConfiguredOnly, &search, ""), None);
        assert_eq!(resolve(&fs, "nope.h", SearchOrder::IncluderFirst, &search, ""), None);
        assert_eq!(
            resolve(&fs, "sub/../sub/y.h", SearchOrder::ConfiguredOnly, &search, "").as_deref(),
            Some("a/sub/y.h")
        );
    }

    #[test]
    fn absolute_name() {
        let mut fs = MemoryFileSystem::new();
        fs.add("/usr/include/z.h", "");
        assert_eq!(
            resolve(&fs, "/usr/include/./z.h", SearchOrder::ConfiguredOnly, &[], "src").as_deref(),
            Some("/usr/include/z.h")
        );
    }
}
