//! Conventions shared by the entities a [`ModelManager`](crate::ModelManager) works with.
//!
//! Entities are expected to carry a UUID primary key named `id` and a `created_at`
//! timestamp filled by the database. [`base_table`] starts a migration with both columns;
//! the manager fills `id` on insert when the caller leaves it unset.

use std::collections::BTreeMap;

use sea_orm::sea_query::{Alias, ColumnDef, Expr, IntoTableRef, Table, TableCreateStatement};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable,
    ModelTrait, Value,
};
use uuid::Uuid;

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Column name to value, in column-name order.
pub type Values = BTreeMap<String, Value>;

/// `CREATE TABLE` statement with the base columns already declared.
///
/// ```rust,ignore
/// let stmt = base_table(child::Entity)
///     .col(ColumnDef::new(child::Column::Title).string().not_null())
///     .to_owned();
/// manager.create_table(stmt).await?;
/// ```
pub fn base_table<T: IntoTableRef>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new(ID_COLUMN))
                .uuid()
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Alias::new(CREATED_AT_COLUMN))
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

/// Sets a fresh v4 UUID on the `id` column when it is a UUID column left `NotSet`.
pub fn assign_id<A: ActiveModelTrait>(active: &mut A) {
    let Some(column) =
        <A::Entity as EntityTrait>::Column::iter().find(|c| c.as_str() == ID_COLUMN)
    else {
        return;
    };
    if matches!(column.def().get_column_type(), ColumnType::Uuid) && active.is_not_set(column) {
        active.set(column, Uuid::new_v4().into());
    }
}

/// Every column of a model.
pub fn model_values<M: ModelTrait>(model: &M) -> Values {
    <M::Entity as EntityTrait>::Column::iter()
        .map(|column| (column.as_str().to_owned(), model.get(column)))
        .collect()
}

/// The columns of an active model that carry a value (`Set` or `Unchanged`).
pub fn active_values<A: ActiveModelTrait>(active: &A) -> Values {
    <A::Entity as EntityTrait>::Column::iter()
        .filter_map(|column| {
            active
                .get(column)
                .into_value()
                .map(|value| (column.as_str().to_owned(), value))
        })
        .collect()
}

/// Field of a partial schema: `Some` is written, `None` leaves the column untouched.
///
/// ```rust,ignore
/// impl IntoActiveModel<ActiveModel> for ChildUpdate {
///     fn into_active_model(self) -> ActiveModel {
///         ActiveModel {
///             title: set_if_some(self.title),
///             // Option<Option<String>>: Some(None) clears the column
///             note: set_if_some(self.note),
///             ..Default::default()
///         }
///     }
/// }
/// ```
pub fn set_if_some<V: Into<Value>>(value: Option<V>) -> ActiveValue<V> {
    value.map_or(ActiveValue::NotSet, ActiveValue::Set)
}

#[must_use]
pub fn is_null(value: &Value) -> bool {
    *value == value.as_null()
}

/// Human readable rendering used in error messages.
#[must_use]
pub fn display_value(value: &Value) -> String {
    if is_null(value) {
        return "null".to_string();
    }
    match value {
        Value::Bool(Some(v)) => v.to_string(),
        Value::TinyInt(Some(v)) => v.to_string(),
        Value::SmallInt(Some(v)) => v.to_string(),
        Value::Int(Some(v)) => v.to_string(),
        Value::BigInt(Some(v)) => v.to_string(),
        Value::TinyUnsigned(Some(v)) => v.to_string(),
        Value::SmallUnsigned(Some(v)) => v.to_string(),
        Value::Unsigned(Some(v)) => v.to_string(),
        Value::BigUnsigned(Some(v)) => v.to_string(),
        Value::Float(Some(v)) => v.to_string(),
        Value::Double(Some(v)) => v.to_string(),
        Value::String(Some(v)) => v.to_string(),
        Value::Char(Some(v)) => v.to_string(),
        Value::Uuid(Some(v)) => v.to_string(),
        Value::ChronoDate(Some(v)) => v.to_string(),
        Value::ChronoDateTime(Some(v)) => v.to_string(),
        Value::ChronoDateTimeUtc(Some(v)) => v.to_string(),
        Value::ChronoDateTimeWithTimeZone(Some(v)) => v.to_string(),
        other => format!("{other:?}"),
    }
}
