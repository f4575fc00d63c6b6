//! # Model Manager
//!
//! [`ModelManager`] wraps one Sea-ORM entity and offers the data access an API endpoint
//! needs: lookups that turn into 404s, filtered and ordered listings, pagination, counting,
//! and writes guarded by database validation (foreign keys, unique columns, composite unique
//! constraints, many-to-many links).
//!
//! Build one manager per entity and share it, typically in a `LazyLock`:
//!
//! ```rust,ignore
//! use std::sync::LazyLock;
//! use axum_sea_toolkit::{ModelManager, OrderBy};
//!
//! static CHILDREN: LazyLock<ModelManager<child::Entity>> = LazyLock::new(|| {
//!     ModelManager::new().with_default_ordering(OrderBy::asc(child::Column::Title))
//! });
//!
//! static PARENTS: LazyLock<ModelManager<parent::Entity>> = LazyLock::new(|| {
//!     ModelManager::new()
//!         .with_unique_constraint(UniqueConstraint::new([
//!             parent::Column::Title,
//!             parent::Column::Description,
//!         ]))
//!         .with_many_to_many(
//!             "categories",
//!             category_parent::Relation::Parent.def(),
//!             category_parent::Relation::Category.def(),
//!         )
//! });
//! ```
//!
//! Every operation is generic over [`ConnectionTrait`](sea_orm::ConnectionTrait): pass a
//! `DatabaseConnection` to commit each call as it runs, or a `DatabaseTransaction` to group
//! several calls and commit once. Writes that issue several statements also need
//! [`TransactionTrait`](sea_orm::TransactionTrait) and run inside their own transaction, a
//! savepoint when `db` is already one.

mod read;
mod validation;
mod write;

pub use validation::UniqueConstraint;
pub use write::{BulkTarget, RelatedIds};

use sea_orm::sea_query::{Alias, DynIden, Expr, IntoIden, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityTrait, IdenStatic, Iterable, ModelTrait, PrimaryKeyToColumn,
    QueryFilter, QueryOrder, QuerySelect, RelationDef, Select, Value,
};

use crate::base::{ID_COLUMN, is_null};
use crate::errors::ApiError;
use crate::filtering::joined::{apply_joins, plan_joins};
use crate::filtering::{FilterMode, OrderBy, QueryArgs};
use crate::meta::{self, ManyToMany, RelationKind, RelationMeta, iden_name};

/// Generic data access for the entity `E`.
#[derive(Debug, Clone)]
pub struct ModelManager<E: EntityTrait> {
    table: DynIden,
    table_name: String,
    primary_key: Option<E::Column>,
    relations: Vec<RelationMeta>,
    many_to_many: Vec<ManyToMany>,
    unique_columns: Vec<E::Column>,
    nullable_columns: Vec<E::Column>,
    unique_constraints: Vec<UniqueConstraint<E::Column>>,
    defaults: Vec<(E::Column, Value)>,
    default_ordering: Vec<OrderBy>,
}

impl<E: EntityTrait> Default for ModelManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> ModelManager<E> {
    /// Reads keys, relations, unique and nullable columns and literal column defaults
    /// (`#[sea_orm(default_value = ...)]`) from the entity definition.
    #[must_use]
    pub fn new() -> Self {
        let entity = E::default();
        let primary_key = E::PrimaryKey::iter().next().map(PrimaryKeyToColumn::into_column);
        let is_primary =
            |column: &E::Column| primary_key.is_some_and(|pk| pk.as_str() == column.as_str());

        let unique_columns = E::Column::iter()
            .filter(|column| column.def().is_unique() && !is_primary(column))
            .collect();
        let nullable_columns = E::Column::iter()
            .filter(|column| column.def().is_null())
            .collect();
        let defaults = E::Column::iter()
            .filter_map(|column| match column.def().get_column_default() {
                Some(SimpleExpr::Value(value)) => Some((column, value.clone())),
                _ => None,
            })
            .collect();

        Self {
            table: entity.into_iden(),
            table_name: entity.table_name().to_owned(),
            primary_key,
            relations: meta::relations::<E>(),
            many_to_many: Vec::new(),
            unique_columns,
            nullable_columns,
            unique_constraints: Vec::new(),
            defaults,
            default_ordering: Vec::new(),
        }
    }

    // ============================================================================
    // Configuration
    // ============================================================================

    /// Ordering applied after the requested one; call again to add tie-breakers.
    #[must_use]
    pub fn with_default_ordering(mut self, order_by: OrderBy) -> Self {
        self.default_ordering.push(order_by);
        self
    }

    /// Composite unique constraint checked before inserts and updates.
    #[must_use]
    pub fn with_unique_constraint(mut self, constraint: UniqueConstraint<E::Column>) -> Self {
        self.unique_constraints.push(constraint);
        self
    }

    /// Many-to-many relationship through a junction entity, given the junction's
    /// `belongs_to` relation to this entity and the one to the target entity.
    #[must_use]
    pub fn with_many_to_many(
        mut self,
        name: impl Into<String>,
        to_local: RelationDef,
        to_target: RelationDef,
    ) -> Self {
        let name = name.into();
        match ManyToMany::new(name.clone(), &to_local, &to_target) {
            Some(link) => self.many_to_many.push(link),
            None => tracing::warn!(
                table = %self.table_name,
                relation = %name,
                "Ignoring many-to-many relation with composite keys"
            ),
        }
        self
    }

    /// Value assumed for `column` during validation when a create leaves it unset.
    ///
    /// Replaces the default read from the entity, if any. Use it for defaults the database
    /// computes, which are not known until the row is stored.
    #[must_use]
    pub fn with_default(mut self, column: E::Column, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self
            .defaults
            .iter_mut()
            .find(|(known, _)| known.as_str() == column.as_str())
        {
            Some(entry) => entry.1 = value,
            None => self.defaults.push((column, value)),
        }
        self
    }

    /// Values assumed for unset columns during create validation.
    #[must_use]
    pub fn defaults(&self) -> &[(E::Column, Value)] {
        &self.defaults
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<E::Column> {
        self.primary_key
    }

    /// Relations whose local column references another table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &RelationMeta> {
        self.relations
            .iter()
            .filter(|relation| relation.kind == RelationKind::ForeignKey)
    }

    /// Relations whose rows reference this entity.
    pub fn reverse_relations(&self) -> impl Iterator<Item = &RelationMeta> {
        self.relations.iter().filter(|relation| {
            matches!(relation.kind, RelationKind::Reverse | RelationKind::ReverseOne)
        })
    }

    #[must_use]
    pub fn many_to_many(&self) -> &[ManyToMany] {
        &self.many_to_many
    }

    #[must_use]
    pub fn unique_columns(&self) -> &[E::Column] {
        &self.unique_columns
    }

    #[must_use]
    pub fn nullable_columns(&self) -> &[E::Column] {
        &self.nullable_columns
    }

    #[must_use]
    pub fn unique_constraints(&self) -> &[UniqueConstraint<E::Column>] {
        &self.unique_constraints
    }

    /// Fresh [`QueryArgs`] for this entity.
    #[must_use]
    pub fn query(&self) -> QueryArgs<E> {
        QueryArgs::new()
    }

    // ============================================================================
    // Statement assembly
    // ============================================================================

    /// The `SELECT` a read runs, for custom projections or further refinement.
    ///
    /// # Errors
    ///
    /// Returns an internal error when `args` filters on a relation the entity does not have.
    pub fn select(&self, args: &QueryArgs<E>, mode: FilterMode) -> Result<Select<E>, ApiError> {
        self.apply_args(E::find(), args, mode, None)
    }

    pub(crate) fn apply_args<Q>(
        &self,
        query: Q,
        args: &QueryArgs<E>,
        mode: FilterMode,
        already_joined: Option<&str>,
    ) -> Result<Q, ApiError>
    where
        Q: QueryFilter + QueryOrder + QuerySelect,
    {
        let orderings: Vec<&OrderBy> = args
            .ordering()
            .into_iter()
            .chain(self.default_ordering.iter())
            .collect();

        let joined_tables = args
            .fields()
            .iter()
            .filter(|filter| !filter.is_absent())
            .map(|filter| filter.table())
            .chain(orderings.iter().map(|order_by| order_by.table()));
        let plan = plan_joins(
            &self.table,
            joined_tables,
            &self.relations,
            &self.many_to_many,
            already_joined,
        );
        let mut query = apply_joins(query, &plan.steps);

        for (column, value) in args.filters() {
            match (is_null(value), mode) {
                (true, FilterMode::SkipNull) => {}
                (true, FilterMode::Strict) => query = query.filter(column.is_null()),
                (false, _) => query = query.filter(ColumnTrait::eq(column, value.clone())),
            }
        }

        for (relation, values) in args.related() {
            query = query.filter(self.related_condition(relation, values)?);
        }

        for filter in args.fields().iter().filter(|f| plan.reaches(f.table())) {
            if let Some(condition) = filter.condition() {
                query = query.filter(condition);
            }
        }

        query = query.filter(args.condition().clone());

        for order_by in orderings.into_iter().filter(|o| plan.reaches(o.table())) {
            query = query.order_by(order_by.expr(), order_by.order());
        }

        let (limit, offset) = args.window();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }
        if args.is_distinct() {
            query = query.distinct();
        }
        Ok(query)
    }

    /// Rows linked to any of `values` through the relation called `name`.
    fn related_condition(&self, name: &str, values: &[Value]) -> Result<SimpleExpr, ApiError> {
        let values = values.iter().cloned();

        if let Some(relation) = self.relations.iter().find(|r| r.name == name) {
            let local = (self.table.clone(), relation.local_column.clone());
            if relation.kind == RelationKind::ForeignKey {
                return Ok(Expr::col(local).is_in(values));
            }
            let target = relation.target_table.clone();
            let subquery = Query::select()
                .expr(Expr::val(1))
                .from(target.clone())
                .and_where(
                    Expr::col((target.clone(), relation.target_column.clone())).equals(local),
                )
                .and_where(Expr::col((target, Alias::new(ID_COLUMN).into_iden())).is_in(values))
                .to_owned();
            return Ok(Expr::exists(subquery));
        }

        if let Some(link) = self.many_to_many.iter().find(|l| l.name == name) {
            let junction = link.junction.clone();
            let subquery = Query::select()
                .expr(Expr::val(1))
                .from(junction.clone())
                .and_where(
                    Expr::col((junction.clone(), link.junction_local.clone()))
                        .equals((self.table.clone(), link.local_column.clone())),
                )
                .and_where(Expr::col((junction, link.junction_target.clone())).is_in(values))
                .to_owned();
            return Ok(Expr::exists(subquery));
        }

        Err(ApiError::internal(
            "Invalid filter configuration",
            Some(format!("{} has no relation named '{name}'", self.table_name)),
        ))
    }

    pub(crate) fn column(&self, name: &str) -> Option<E::Column> {
        E::Column::iter().find(|column| column.as_str() == name)
    }

    pub(crate) fn require_primary_key(&self) -> Result<E::Column, ApiError> {
        self.primary_key.ok_or_else(|| {
            ApiError::internal(
                "Entity has no primary key",
                Some(self.table_name.clone()),
            )
        })
    }

    pub(crate) fn link(&self, name: &str) -> Option<&ManyToMany> {
        self.many_to_many.iter().find(|link| link.name == name)
    }

    pub(crate) fn link_or_422(&self, name: &str) -> Result<&ManyToMany, ApiError> {
        self.link(name).ok_or_else(|| {
            ApiError::unprocessable(format!(
                "{} has no many-to-many relation named '{name}'",
                self.table_name
            ))
        })
    }

    pub(crate) fn local_value(&self, model: &E::Model, column: &DynIden) -> Result<Value, ApiError> {
        let name = iden_name(column);
        self.column(&name)
            .map(|column| model.get(column))
            .ok_or_else(|| {
                ApiError::internal(
                    "Invalid relation configuration",
                    Some(format!("{} has no column '{name}'", self.table_name)),
                )
            })
    }
}
