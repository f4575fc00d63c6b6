//! Join planning for filters and orderings on related entity columns.
//!
//! Filtering `children` by `parent.title` or ordering by it needs `parent` in the `FROM`
//! clause. The planner looks up how the managed table reaches each referenced table (a
//! reflected relation or a configured many-to-many link) and adds a `LEFT JOIN` for it.
//! Only direct relations are followed. A table no relation leads to is reported as
//! unreachable, and the filters and orderings on it are dropped.

use sea_orm::QuerySelect;
use sea_orm::sea_query::{DynIden, Expr, JoinType, SimpleExpr};

use crate::meta::{ManyToMany, RelationMeta, iden_name};

#[derive(Debug, Clone)]
pub(crate) struct JoinStep {
    table: DynIden,
    on: SimpleExpr,
}

impl JoinStep {
    pub(crate) fn table_name(&self) -> String {
        iden_name(&self.table)
    }
}

/// Joins for a statement, plus the referenced tables they could not reach.
#[derive(Debug, Clone, Default)]
pub(crate) struct JoinPlan {
    pub(crate) steps: Vec<JoinStep>,
    unreachable: Vec<String>,
}

impl JoinPlan {
    /// Whether columns of `table` can be used in the planned statement.
    pub(crate) fn reaches(&self, table: &DynIden) -> bool {
        !self.unreachable.contains(&iden_name(table))
    }
}

/// Joins needed to reach `tables` from `main_table`, in first-seen order.
///
/// `already_joined` names a table the caller joins itself (eager loading).
pub(crate) fn plan_joins<'a, I>(
    main_table: &DynIden,
    tables: I,
    relations: &[RelationMeta],
    links: &[ManyToMany],
    already_joined: Option<&str>,
) -> JoinPlan
where
    I: IntoIterator<Item = &'a DynIden>,
{
    let main_name = iden_name(main_table);
    let mut seen: Vec<String> = Vec::new();
    let mut plan = JoinPlan::default();

    for table in tables {
        let name = iden_name(table);
        if name == main_name || already_joined == Some(name.as_str()) || seen.contains(&name) {
            continue;
        }
        seen.push(name.clone());

        if let Some(relation) = relations.iter().find(|r| r.target_table_name() == name) {
            plan.steps.push(JoinStep {
                table: relation.target_table.clone(),
                on: Expr::col((relation.target_table.clone(), relation.target_column.clone()))
                    .equals((main_table.clone(), relation.local_column.clone())),
            });
        } else if let Some(link) = links.iter().find(|l| l.target_table_name() == name) {
            plan.steps.push(JoinStep {
                table: link.junction.clone(),
                on: Expr::col((link.junction.clone(), link.junction_local.clone()))
                    .equals((main_table.clone(), link.local_column.clone())),
            });
            plan.steps.push(JoinStep {
                table: link.target_table.clone(),
                on: Expr::col((link.target_table.clone(), link.target_column.clone()))
                    .equals((link.junction.clone(), link.junction_target.clone())),
            });
        } else {
            tracing::warn!(
                table = %main_name,
                related = %name,
                "No relation leads to the filtered table, skipping its filters"
            );
            plan.unreachable.push(name);
        }
    }
    plan
}

pub(crate) fn apply_joins<Q: QuerySelect>(mut query: Q, steps: &[JoinStep]) -> Q {
    for step in steps {
        QuerySelect::query(&mut query).join(JoinType::LeftJoin, step.table.clone(), step.on.clone());
    }
    query
}
