// src/query/tree.rs
// =============================================================================
// Level-by-level expansion of a dependency tree.
//
// The tree is assembled in a flat arena (Vec of slots addressed by index):
// each level fetches the direct modules of every frontier slot, appends them
// as new slots, and records their indices as the parent's children. Only at
// the end is the arena turned into nested RepoTree values. Stored rows are
// never modified.
//
// A node reachable along several paths appears once per path, and modules of
// a node are fetched from the store once per query.
// =============================================================================

use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::{RepoRow, RepoTree};
use crate::store::GraphStore;

struct Slot {
    row: RepoRow,
    children: Vec<usize>,
}

impl Slot {
    fn new(row: RepoRow) -> Self {
        Slot {
            row,
            children: Vec::new(),
        }
    }
}

// Expands `root` to at most `depth` levels. Stops early when a level has no
// children at all.
pub fn build_tree(
    graph: &dyn GraphStore,
    root: RepoRow,
    depth: usize,
) -> Result<RepoTree, StoreError> {
    let mut arena = vec![Slot::new(root)];
    let mut fetched: HashMap<i64, Vec<RepoRow>> = HashMap::new();
    let mut frontier = vec![0usize];
    let mut remaining = depth;

    while remaining > 0 && !frontier.is_empty() {
        let mut next = Vec::new();

        for parent in frontier {
            let id = arena[parent].row.id;

            let modules = match fetched.get(&id) {
                Some(modules) => modules.clone(),
                None => {
                    let modules = graph.modules_of(id)?;
                    fetched.insert(id, modules.clone());
                    modules
                }
            };

            for row in modules {
                let index = arena.len();
                arena.push(Slot::new(row));
                arena[parent].children.push(index);
                next.push(index);
            }
        }

        frontier = next;
        remaining -= 1;
    }

    Ok(materialize(&arena, 0))
}

fn materialize(arena: &[Slot], index: usize) -> RepoTree {
    let slot = &arena[index];
    RepoTree {
        row: slot.row.clone(),
        modules: slot
            .children
            .iter()
            .map(|&child| materialize(arena, child))
            .collect(),
    }
}
