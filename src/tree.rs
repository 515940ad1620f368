//! Text rendering of dependency trees.

use crate::graph::NodeId;
use rustc_hash::FxHashSet;
use std::sync::Arc;

struct Render {
    prune: bool,
    out: String,
    /// One entry per ancestor level: whether that ancestor has siblings
    /// still to print, which decides between "| " and "  ".
    margin: Vec<bool>,
    printed: FxHashSet<NodeId>,
    ancestors: FxHashSet<NodeId>,
}

impl Render {
    fn node<E>(
        &mut self,
        id: NodeId,
        more: bool,
        children: &mut dyn FnMut(NodeId) -> Result<Vec<NodeId>, E>,
        name: &dyn Fn(NodeId) -> Arc<str>,
    ) -> Result<(), E> {
        for &open in &self.margin {
            self.out.push_str(if open { "| " } else { "  " });
        }
        let repeat = self.ancestors.contains(&id) || (self.prune && self.printed.contains(&id));
        if repeat {
            self.out.push_str(&format!("+-[{}]\n", name(id)));
            return Ok(());
        }
        self.out.push_str(&format!("+-{}\n", name(id)));
        self.printed.insert(id);

        let kids = children(id)?;
        self.ancestors.insert(id);
        self.margin.push(more);
        for (i, &kid) in kids.iter().enumerate() {
            self.node(kid, i + 1 < kids.len(), children, name)?;
        }
        self.margin.pop();
        self.ancestors.remove(&id);
        Ok(())
    }
}

/// Render the tree under `root`:
///
/// ```text
/// +-main.o
///   +-main.c
///   | +-main.h
///   +-util.h
/// ```
///
/// A node that is its own ancestor is printed in brackets and not expanded.
/// With `prune`, so is any node already printed elsewhere in the tree.
pub fn render_tree<E>(
    root: NodeId,
    mut children: impl FnMut(NodeId) -> Result<Vec<NodeId>, E>,
    name: impl Fn(NodeId) -> Arc<str>,
    prune: bool,
) -> Result<String, E> {
    let mut render = Render {
        prune,
        out: String::new(),
        margin: Vec::new(),
        printed: FxHashSet::default(),
        ancestors: FxHashSet::default(),
    };
    render.node(root, false, &mut children, &name)?;
    Ok(render.out)
}
