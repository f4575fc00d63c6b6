//! Database validation run before writes.
//!
//! Each check issues an existence query and stops at the first failure with a 422:
//!
//! 1. foreign keys point at existing rows
//! 2. many-to-many ids point at existing rows
//! 3. unique columns are not taken by another row
//! 4. composite unique constraints are not taken by another row

use sea_orm::sea_query::{DynIden, Expr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, IdenStatic, ModelTrait, QueryFilter,
    Value,
};

use super::ModelManager;
use super::write::RelatedIds;
use crate::base::{Values, display_value, is_null};
use crate::errors::ApiError;
use crate::meta::iden_name;

/// Columns whose combined values must be unique.
///
/// By default rows with a null in any of the columns never collide, as in SQL. With
/// [`nulls_not_distinct`](Self::nulls_not_distinct) nulls compare equal, like PostgreSQL's
/// `UNIQUE NULLS NOT DISTINCT`.
#[derive(Debug, Clone)]
pub struct UniqueConstraint<C> {
    columns: Vec<C>,
    nulls_not_distinct: bool,
}

impl<C: ColumnTrait> UniqueConstraint<C> {
    pub fn new(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            nulls_not_distinct: false,
        }
    }

    #[must_use]
    pub fn nulls_not_distinct(mut self) -> Self {
        self.nulls_not_distinct = true;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    #[must_use]
    pub fn is_nulls_not_distinct(&self) -> bool {
        self.nulls_not_distinct
    }
}

impl<E: EntityTrait> ModelManager<E> {
    /// Runs every check against the values a write would store.
    ///
    /// `values` holds the full row as it would look after the write; `existing` is the stored
    /// row for updates.
    ///
    /// # Errors
    ///
    /// Returns a 422 error describing the first failed check.
    pub async fn run_db_validation<C: ConnectionTrait>(
        &self,
        db: &C,
        values: &Values,
        existing: Option<&E::Model>,
        related: &RelatedIds,
    ) -> Result<(), ApiError> {
        self.validate_foreign_keys(db, values).await?;
        self.validate_many_to_many(db, related).await?;
        self.validate_unique_fields(db, values, existing).await?;
        self.validate_unique_constraints(db, values).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a 422 error when a non-null foreign key value has no target row.
    pub async fn validate_foreign_keys<C: ConnectionTrait>(
        &self,
        db: &C,
        values: &Values,
    ) -> Result<(), ApiError> {
        for relation in self.foreign_keys() {
            let Some(value) = values.get(&relation.local_column_name()) else {
                continue;
            };
            if is_null(value) {
                continue;
            }
            if !row_exists(db, &relation.target_table, &relation.target_column, value).await? {
                return Err(missing_target(&relation.target_table, value));
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a 422 error for an unknown relation name or an id with no target row.
    pub async fn validate_many_to_many<C: ConnectionTrait>(
        &self,
        db: &C,
        related: &RelatedIds,
    ) -> Result<(), ApiError> {
        for (name, ids) in related.iter() {
            let link = self.link_or_422(name)?;
            for id in ids {
                if !row_exists(db, &link.target_table, &link.target_column, id).await? {
                    return Err(missing_target(&link.target_table, id));
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a 422 error when another row already holds a unique column value.
    pub async fn validate_unique_fields<C: ConnectionTrait>(
        &self,
        db: &C,
        values: &Values,
        existing: Option<&E::Model>,
    ) -> Result<(), ApiError> {
        for column in &self.unique_columns {
            let Some(value) = values.get(column.as_str()) else {
                continue;
            };
            if is_null(value) || existing.is_some_and(|row| row.get(*column) == *value) {
                continue;
            }
            let condition = Condition::all().add(ColumnTrait::eq(column, value.clone()));
            if self.taken_by_other_row(db, condition, values).await? {
                return Err(ApiError::unprocessable(format!(
                    "{} with {} {} already exists",
                    self.table_name,
                    column.as_str(),
                    display_value(value)
                )));
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a 422 error when another row already holds the same combination.
    pub async fn validate_unique_constraints<C: ConnectionTrait>(
        &self,
        db: &C,
        values: &Values,
    ) -> Result<(), ApiError> {
        'constraints: for constraint in &self.unique_constraints {
            let mut condition = Condition::all();
            for column in constraint.columns() {
                match values.get(column.as_str()) {
                    Some(value) if !is_null(value) => {
                        condition = condition.add(ColumnTrait::eq(column, value.clone()));
                    }
                    _ if constraint.is_nulls_not_distinct() => {
                        condition = condition.add(column.is_null());
                    }
                    _ => continue 'constraints,
                }
            }
            if self.taken_by_other_row(db, condition, values).await? {
                let names: Vec<&str> = constraint.columns().iter().map(|c| c.as_str()).collect();
                return Err(ApiError::unprocessable(format!(
                    "{} with such {} already exists.",
                    self.table_name,
                    names.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Whether a row other than the one described by `values` matches `condition`.
    async fn taken_by_other_row<C: ConnectionTrait>(
        &self,
        db: &C,
        mut condition: Condition,
        values: &Values,
    ) -> Result<bool, ApiError> {
        if let Some(pk) = self.primary_key {
            if let Some(own_id) = values.get(pk.as_str()).filter(|v| !is_null(v)) {
                condition = condition.add(ColumnTrait::ne(&pk, own_id.clone()));
            }
        }
        Ok(E::find().filter(condition).one(db).await?.is_some())
    }

    /// Values a create would store: nulls for nullable columns, configured defaults, then
    /// the values the caller set.
    pub(crate) fn values_for_create(&self, provided: Values) -> Values {
        let mut values: Values = self
            .nullable_columns
            .iter()
            .map(|column| (column.as_str().to_owned(), Value::String(None)))
            .collect();
        values.extend(
            self.defaults
                .iter()
                .map(|(column, value)| (column.as_str().to_owned(), value.clone())),
        );
        values.extend(provided);
        values
    }
}

async fn row_exists<C: ConnectionTrait>(
    db: &C,
    table: &DynIden,
    column: &DynIden,
    value: &Value,
) -> Result<bool, ApiError> {
    let stmt = Query::select()
        .expr(Expr::val(1))
        .from(table.clone())
        .and_where(Expr::col((table.clone(), column.clone())).eq(value.clone()))
        .limit(1)
        .to_owned();
    let backend = db.get_database_backend();
    Ok(db.query_one(backend.build(&stmt)).await?.is_some())
}

fn missing_target(table: &DynIden, value: &Value) -> ApiError {
    ApiError::unprocessable(format!(
        "{} with id {} does not exist.",
        iden_name(table),
        display_value(value)
    ))
}
