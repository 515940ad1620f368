//! Path canonicalization.
//!
//! Node identity is the lexically canonical path string; nothing here touches
//! the disk.

fn is_sep(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with(is_sep) || std::path::Path::new(path).is_absolute()
}

/// Lexically canonicalize a path, removing redundant components.
/// Does not access the disk, but only simplifies things like
/// "foo/./bar" => "foo/bar" and "foo/../bar" => "bar".
pub fn canon_path<T: Into<String>>(inpath: T) -> String {
    let path: String = inpath.into();
    let rooted = path.starts_with(is_sep);
    let mut out = String::with_capacity(path.len());
    if rooted {
        out.push('/');
    }
    // Offsets into `out` where each poppable component starts.
    let mut components: Vec<usize> = Vec::new();
    for comp in path.split(is_sep) {
        match comp {
            "" | "." => {}
            ".." => match components.pop() {
                Some(ofs) => out.truncate(ofs),
                // Can't go above the root.
                None if rooted => {}
                None => out.push_str("../"),
            },
            _ => {
                components.push(out.len());
                out.push_str(comp);
                out.push('/');
            }
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Key used to order dependency lists: separator-normalized and case-folded,
/// so that the order does not depend on the platform or the spelling of a
/// path on a case-insensitive filesystem.
pub fn sort_key(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// The directory part of a canonical path; "" for a bare file name.
pub fn dirname(path: &str) -> &str {
    match path.rfind(is_sep) {
        None => "",
        Some(0) => &path[..1],
        Some(ofs) => &path[..ofs],
    }
}

/// Join `name` onto `dir` and canonicalize.  An absolute `name` ignores `dir`.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() || is_absolute(name) {
        return canon_path(name);
    }
    let mut path = String::with_capacity(dir.len() + name.len() + 1);
    path.push_str(dir);
    path.push('/');
    path.push_str(name);
    canon_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop() {
        assert_eq!(canon_path("foo"), "foo");
        assert_eq!(canon_path("foo/bar"), "foo/bar");
    }

    #[test]
    fn dot() {
        assert_eq!(canon_path("./foo"), "foo");
        assert_eq!(canon_path("foo/."), "foo");
        assert_eq!(canon_path("foo/./bar"), "foo/bar");
        assert_eq!(canon_path("."), "");
    }

    #[test]
    fn slash() {
        assert_eq!(canon_path("/foo"), "/foo");
        assert_eq!(canon_path("foo//bar"), "foo/bar");
        assert_eq!(canon_path("foo/"), "foo");
        assert_eq!(canon_path("/"), "/");
    }

    #[test]
    fn parent() {
        assert_eq!(canon_path("foo/../bar"), "bar");
        assert_eq!(canon_path("/foo/../bar"), "/bar");
        assert_eq!(canon_path("/../bar"), "/bar");
        assert_eq!(canon_path("../foo"), "../foo");
        assert_eq!(canon_path("../foo/../bar"), "../bar");
        assert_eq!(canon_path("../../bar"), "../../bar");
        assert_eq!(canon_path("foo/.."), "");
    }

    #[test]
    fn dirs() {
        assert_eq!(dirname("src/main.f"), "src");
        assert_eq!(dirname("main.f"), "");
        assert_eq!(dirname("/main.f"), "/");
        assert_eq!(join("", "a.h"), "a.h");
        assert_eq!(join("src", "../inc/a.h"), "inc/a.h");
        assert_eq!(join("src", "/usr/include/a.h"), "/usr/include/a.h");
    }

    #[test]
    fn keys() {
        assert_eq!(sort_key("Src\\Foo.H"), "src/foo.h");
        assert!(sort_key("a/B.h") < sort_key("a/c.h"));
    }
}
