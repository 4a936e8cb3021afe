//! Foreign-key dependency ordering.

use super::definition::TableDefinition;
use crate::models::TableIdentifier;
use std::collections::{HashMap, HashSet};

/// Orders tables so that every referenced table precedes its referrers.
///
/// Input order is kept wherever dependencies allow it. A cycle is broken at
/// the edge that would revisit a table still being placed. Repeated tables
/// collapse to their first position.
pub fn order_by_dependencies(tables: Vec<TableDefinition>) -> Vec<TableDefinition> {
    let mut by_id: HashMap<TableIdentifier, TableDefinition> = HashMap::new();
    let mut input_order = Vec::new();
    for table in tables {
        if !by_id.contains_key(&table.identifier) {
            input_order.push(table.identifier.clone());
            by_id.insert(table.identifier.clone(), table);
        }
    }

    let mut placed: HashSet<TableIdentifier> = HashSet::new();
    let mut in_progress: HashSet<TableIdentifier> = HashSet::new();
    let mut ordered_ids = Vec::with_capacity(input_order.len());

    for id in &input_order {
        visit(id, &by_id, &mut placed, &mut in_progress, &mut ordered_ids);
    }

    ordered_ids
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

fn visit(
    id: &TableIdentifier,
    by_id: &HashMap<TableIdentifier, TableDefinition>,
    placed: &mut HashSet<TableIdentifier>,
    in_progress: &mut HashSet<TableIdentifier>,
    ordered: &mut Vec<TableIdentifier>,
) {
    if placed.contains(id) || in_progress.contains(id) {
        return;
    }
    let Some(table) = by_id.get(id) else {
        return;
    };

    in_progress.insert(id.clone());
    for referenced in table.referenced_tables() {
        visit(referenced, by_id, placed, in_progress, ordered);
    }
    in_progress.remove(id);

    placed.insert(id.clone());
    ordered.push(id.clone());
}
