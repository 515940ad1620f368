//! Content scanners: extract raw include references from file text.
//!
//! Scanners are lightweight pattern matchers, not compiler front ends.  They
//! ignore preprocessor conditionals entirely, so they may report references
//! that a real compile would never follow; that over-approximation is what
//! keeps incremental builds from missing a dependency.

use crate::resolve::SearchOrder;
use regex::Regex;
use rustc_hash::FxHashSet;

/// How an include reference was spelled, which decides where it is looked up.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IncludeKind {
    /// `"name"`: the includer's directory first, then the search path.
    Quoted,
    /// `<name>`: the search path only.
    Angle,
}

impl IncludeKind {
    pub fn search_order(self) -> SearchOrder {
        match self {
            IncludeKind::Quoted => SearchOrder::IncluderFirst,
            IncludeKind::Angle => SearchOrder::ConfiguredOnly,
        }
    }
}

/// A textual reference found in a file, not yet resolved to a node.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Include {
    pub name: String,
    pub kind: IncludeKind,
}

impl Include {
    pub fn quoted(name: impl Into<String>) -> Self {
        Include {
            name: name.into(),
            kind: IncludeKind::Quoted,
        }
    }

    pub fn angle(name: impl Into<String>) -> Self {
        Include {
            name: name.into(),
            kind: IncludeKind::Angle,
        }
    }
}

/// One include syntax.  Implementations must be pure: no I/O, and the
/// returned references are in the order they appear in `content`.
pub trait IncludeScanner: Send + Sync {
    fn name(&self) -> &str;
    fn scan(&self, content: &str) -> Vec<Include>;
}

/// Matches `#include "x"` / `#include <x>` style directives, returning
/// (offset, include) pairs where the offset is the start of the directive's
/// line.  Anchored at line start so that text inside string literals is not
/// mistaken for a directive.
struct CppDirectives(Regex);

impl CppDirectives {
    fn new() -> Self {
        CppDirectives(
            Regex::new(
                r#"(?m)^[ \t]*#[ \t]*(?:include|include_next|import)[ \t]*(?:"([^"\r\n]+)"|<([^>\r\n]+)>)"#,
            )
            .expect("cpp directive pattern"),
        )
    }

    fn find(&self, content: &str, out: &mut Vec<(usize, Include)>) {
        for caps in self.0.captures_iter(content) {
            let ofs = caps.get(0).map_or(0, |m| m.start());
            if let Some(m) = caps.get(1) {
                out.push((ofs, Include::quoted(m.as_str())));
            } else if let Some(m) = caps.get(2) {
                out.push((ofs, Include::angle(m.as_str())));
            }
        }
    }
}

/// C, C++ and Objective-C preprocessor includes.
pub struct CScanner {
    directives: CppDirectives,
}

impl CScanner {
    pub fn new() -> Self {
        CScanner {
            directives: CppDirectives::new(),
        }
    }
}

impl Default for CScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl IncludeScanner for CScanner {
    fn name(&self) -> &str {
        "c"
    }

    fn scan(&self, content: &str) -> Vec<Include> {
        let mut found = Vec::new();
        self.directives.find(content, &mut found);
        found.into_iter().map(|(_, inc)| inc).collect()
    }
}

/// Fortran `INCLUDE 'file'` statements, plus cpp `#include` lines for
/// sources that go through the preprocessor (`.F`).
///
/// INCLUDE is matched anywhere on a line and in any case; a match inside a
/// comment is a harmless extra dependency.
pub struct FortranScanner {
    statements: Regex,
    directives: CppDirectives,
}

impl FortranScanner {
    pub fn new() -> Self {
        FortranScanner {
            statements: Regex::new(r#"(?i)INCLUDE[ \t]+(?:'([\w./\\-]+)'|"([\w./\\-]+)")"#)
                .expect("fortran include pattern"),
            directives: CppDirectives::new(),
        }
    }
}

impl Default for FortranScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl IncludeScanner for FortranScanner {
    fn name(&self) -> &str {
        "fortran"
    }

    fn scan(&self, content: &str) -> Vec<Include> {
        let mut found = Vec::new();
        self.directives.find(content, &mut found);
        let directive_lines: FxHashSet<usize> = found.iter().map(|&(ofs, _)| ofs).collect();
        for caps in self.statements.captures_iter(content) {
            let ofs = caps.get(0).map_or(0, |m| m.start());
            let line_start = content[..ofs].rfind('\n').map_or(0, |nl| nl + 1);
            // `#include "x"` also matches as a statement; count it once.
            if directive_lines.contains(&line_start) {
                continue;
            }
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                found.push((ofs, Include::quoted(m.as_str())));
            }
        }
        found.sort_by_key(|&(ofs, _)| ofs);
        found.into_iter().map(|(_, inc)| inc).collect()
    }
}

/// A scanner built from a regex whose first capture group is the included
/// name.  This is the hook for include syntaxes without a dedicated scanner,
/// e.g. `PatternScanner::new("asm", r#"(?m)^\s*\.include\s+"([^"]+)""#, IncludeKind::Quoted)`.
pub struct PatternScanner {
    name: String,
    pattern: Regex,
    kind: IncludeKind,
}

impl PatternScanner {
    pub fn new(name: &str, pattern: &str, kind: IncludeKind) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| anyhow::anyhow!("scanner {:?}: bad pattern: {}", name, err))?;
        if pattern.captures_len() < 2 {
            anyhow::bail!("scanner {:?}: pattern needs a capture group", name);
        }
        Ok(PatternScanner {
            name: name.to_owned(),
            pattern,
            kind,
        })
    }
}

impl IncludeScanner for PatternScanner {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, content: &str) -> Vec<Include> {
        self.pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| Include {
                name: m.as_str().to_owned(),
                kind: self.kind,
            })
            .collect()
    }
}
