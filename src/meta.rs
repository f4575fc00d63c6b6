//! Relationship metadata read from Sea-ORM entity definitions.
//!
//! Each `Relation` variant of an entity is described once, when a manager is built:
//! `belongs_to` relations become foreign keys the manager validates, `has_many` relations
//! become reverse relations that can be filtered with `EXISTS`, and every relation can be
//! joined for filtering or ordering on the related table.

use heck::ToSnakeCase;
use sea_orm::sea_query::{DynIden, Iden, TableRef};
use sea_orm::{EntityTrait, Identity, Iterable, RelationDef, RelationTrait, RelationType};

/// What a relation looks like from the entity that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `belongs_to`: a local column references another table.
    ForeignKey,
    /// `has_many`: rows of another table reference this entity.
    Reverse,
    /// `has_one`: a single row of another table references this entity.
    ReverseOne,
}

/// A single-column relation between the managed table and `target_table`.
#[derive(Debug, Clone)]
pub struct RelationMeta {
    /// snake_case name of the `Relation` variant (`Relation::Children` -> `children`)
    pub name: String,
    pub kind: RelationKind,
    pub local_column: DynIden,
    pub target_table: DynIden,
    pub target_column: DynIden,
}

impl RelationMeta {
    fn from_def(name: String, def: &RelationDef) -> Option<Self> {
        let kind = match (&def.rel_type, def.is_owner) {
            (RelationType::HasOne, false) => RelationKind::ForeignKey,
            (RelationType::HasMany, _) => RelationKind::Reverse,
            (RelationType::HasOne, true) => RelationKind::ReverseOne,
        };
        Some(Self {
            name,
            kind,
            local_column: unary(&def.from_col)?,
            target_table: table_iden(&def.to_tbl)?,
            target_column: unary(&def.to_col)?,
        })
    }

    #[must_use]
    pub fn local_column_name(&self) -> String {
        iden_name(&self.local_column)
    }

    #[must_use]
    pub fn target_table_name(&self) -> String {
        iden_name(&self.target_table)
    }
}

/// A many-to-many relationship stored in a junction table.
///
/// Built from the two `belongs_to` relations of the junction entity: one pointing back to
/// the managed entity and one pointing to the target entity.
#[derive(Debug, Clone)]
pub struct ManyToMany {
    pub name: String,
    pub junction: DynIden,
    /// Junction column referencing the managed entity.
    pub junction_local: DynIden,
    /// Column of the managed entity referenced by the junction.
    pub local_column: DynIden,
    /// Junction column referencing the target entity.
    pub junction_target: DynIden,
    pub target_table: DynIden,
    pub target_column: DynIden,
}

impl ManyToMany {
    /// `None` when either relation spans more than one column.
    #[must_use]
    pub fn new(name: impl Into<String>, to_local: &RelationDef, to_target: &RelationDef) -> Option<Self> {
        Some(Self {
            name: name.into(),
            junction: table_iden(&to_local.from_tbl)?,
            junction_local: unary(&to_local.from_col)?,
            local_column: unary(&to_local.to_col)?,
            junction_target: unary(&to_target.from_col)?,
            target_table: table_iden(&to_target.to_tbl)?,
            target_column: unary(&to_target.to_col)?,
        })
    }

    #[must_use]
    pub fn target_table_name(&self) -> String {
        iden_name(&self.target_table)
    }
}

/// Describes every single-column relation declared by `E`.
///
/// Composite relations are skipped with a warning.
pub fn relations<E: EntityTrait>() -> Vec<RelationMeta> {
    E::Relation::iter()
        .filter_map(|relation| {
            let name = format!("{relation:?}").to_snake_case();
            let meta = RelationMeta::from_def(name.clone(), &relation.def());
            if meta.is_none() {
                tracing::warn!(
                    table = %E::default().table_name(),
                    relation = %name,
                    "Skipping composite relation"
                );
            }
            meta
        })
        .collect()
}

pub(crate) fn iden_name(iden: &DynIden) -> String {
    Iden::to_string(&**iden)
}

fn unary(identity: &Identity) -> Option<DynIden> {
    match identity {
        Identity::Unary(column) => Some(column.clone()),
        _ => None,
    }
}

fn table_iden(table: &TableRef) -> Option<DynIden> {
    match table {
        TableRef::Table(table)
        | TableRef::TableAlias(table, _)
        | TableRef::SchemaTable(_, table)
        | TableRef::SchemaTableAlias(_, table, _)
        | TableRef::DatabaseSchemaTable(_, _, table)
        | TableRef::DatabaseSchemaTableAlias(_, _, table, _) => Some(table.clone()),
        _ => None,
    }
}
