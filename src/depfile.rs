//! Parsing of Makefile-style depfiles as written by `gcc -MD` and friends,
//! giving the dependencies a build step reported after it ran.

use crate::fs::FileSystem;
use crate::graph::{EdgeKind, Graph, NodeId};
use crate::lexer::{Lexer, ParseResult};
use anyhow::anyhow;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepfileRule {
    pub targets: Vec<String>,
    pub deps: Vec<String>,
}

/// Skip spaces and backslashed newlines.
fn skip_spaces(lexer: &mut Lexer) {
    loop {
        match lexer.peek() {
            ' ' | '\t' => lexer.next(),
            '\\' if lexer.peek_at(1) == '\n' => lexer.ofs += 2,
            '\\' if lexer.peek_at(1) == '\r' && lexer.peek_at(2) == '\n' => lexer.ofs += 3,
            _ => break,
        }
    }
}

/// Skip blank lines and comments between rules.
fn skip_blank_lines(lexer: &mut Lexer) {
    loop {
        skip_spaces(lexer);
        if lexer.skip_newline() {
            continue;
        }
        if lexer.peek() == '#' {
            while !lexer.at_end() && !lexer.peek_newline() {
                lexer.next();
            }
            continue;
        }
        break;
    }
}

fn read_path(lexer: &mut Lexer) -> Option<String> {
    skip_spaces(lexer);
    let mut path: Vec<u8> = Vec::new();
    loop {
        match lexer.peek() {
            _ if lexer.at_end() => break,
            ' ' | '\t' | '\n' => break,
            '\r' if lexer.peek_at(1) == '\n' => break,
            // "c:\foo" is a path, "foo: bar" is a rule.
            ':' if matches!(lexer.peek_at(1), ' ' | '\t' | '\n' | '\r' | '\0') => break,
            '\\' => match lexer.peek_at(1) {
                ' ' | '#' => {
                    lexer.next();
                    path.push(lexer.read() as u8);
                }
                '\n' | '\r' => break,
                _ => path.push(lexer.read() as u8),
            },
            '$' if lexer.peek_at(1) == '$' => {
                lexer.next();
                path.push(lexer.read() as u8);
            }
            c => {
                lexer.next();
                path.push(c as u8);
            }
        }
    }
    if path.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&path).into_owned())
}

fn parse_rules(lexer: &mut Lexer) -> ParseResult<Vec<DepfileRule>> {
    let mut rules = Vec::new();
    loop {
        skip_blank_lines(lexer);
        if lexer.at_end() {
            break;
        }
        let mut targets = Vec::new();
        while let Some(target) = read_path(lexer) {
            targets.push(target);
        }
        if targets.is_empty() {
            return lexer.parse_error("expected file");
        }
        if !lexer.skip(':') {
            return lexer.parse_error("expected ':'");
        }
        let mut deps = Vec::new();
        while let Some(dep) = read_path(lexer) {
            deps.push(dep);
        }
        if !lexer.at_end() && !lexer.skip_newline() {
            return lexer.parse_error(format!("unexpected {:?}", lexer.peek()));
        }
        rules.push(DepfileRule { targets, deps });
    }
    Ok(rules)
}

/// Parse depfile text; `filename` is only used in error messages.
pub fn parse(filename: &str, text: &str) -> anyhow::Result<Vec<DepfileRule>> {
    let mut lexer = Lexer::new(text.as_bytes());
    parse_rules(&mut lexer).map_err(|err| anyhow!(lexer.format_parse_error(filename, err)))
}

pub fn read(fs: &dyn FileSystem, path: &str) -> anyhow::Result<Vec<DepfileRule>> {
    let bytes = fs.read(path).map_err(|err| anyhow!("read {}: {}", path, err))?;
    parse(path, &String::from_utf8_lossy(&bytes))
}

/// Record the rules as `Output` edges, replacing what earlier depfiles
/// reported for the same targets.  Returns the targets whose edges changed.
pub fn add_to_graph(graph: &mut Graph, rules: &[DepfileRule]) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut deps_by_target: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for rule in rules {
        let deps: Vec<NodeId> = rule.deps.iter().map(|dep| graph.file_id(dep)).collect();
        for target in &rule.targets {
            let id = graph.file_id(target);
            let entry = deps_by_target.entry(id).or_insert_with(|| {
                order.push(id);
                Vec::new()
            });
            for &dep in &deps {
                if dep != id && !entry.contains(&dep) {
                    entry.push(dep);
                }
            }
        }
    }

    let mut changed = Vec::new();
    for id in order {
        if graph.set_deps(id, EdgeKind::Output, &deps_by_target[&id]) {
            changed.push(id);
        }
    }
    changed
}
