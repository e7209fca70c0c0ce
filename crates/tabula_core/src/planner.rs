//! Derives the flat, joined SELECT behind a grid schema.

use serde::{Deserialize, Serialize};

use crate::Schema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub select_list: Vec<String>,
    /// Join clauses in first-seen order; identical text appears once.
    pub join_set: Vec<String>,
    /// Owning schema column for each `select_list` entry.
    pub column_map: Vec<usize>,
}

impl QueryPlan {
    pub fn select_sql(&self, table: &str) -> String {
        let joins: String = self
            .join_set
            .iter()
            .map(|join| format!(" {join}"))
            .collect();
        format!(
            "SELECT {} FROM {table}{joins}",
            self.select_list.join(", ")
        )
    }

    pub fn width(&self) -> usize {
        self.select_list.len()
    }
}

pub fn plan(schema: &Schema) -> QueryPlan {
    let mut plan = QueryPlan {
        select_list: Vec::new(),
        join_set: Vec::new(),
        column_map: Vec::new(),
    };
    for (index, column) in schema.columns().iter().enumerate() {
        if column.delete_action {
            continue;
        }
        plan.select_list.push(column.column_name.clone());
        plan.column_map.push(index);
        let Some(spec) = &column.foreign_key else {
            continue;
        };
        push_join(&mut plan.join_set, spec.join_clause());
        for clause in &spec.additional_joins {
            push_join(&mut plan.join_set, clause.clone());
        }
        for display in &spec.display_columns {
            plan.select_list.push(display.clone());
            plan.column_map.push(index);
        }
        for aux in &spec.auxiliary_columns {
            plan.select_list.push(aux.column_name.clone());
            plan.column_map.push(index);
        }
    }
    plan
}

fn push_join(joins: &mut Vec<String>, clause: String) {
    if !joins.contains(&clause) {
        joins.push(clause);
    }
}
