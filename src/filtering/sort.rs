use sea_orm::{ColumnTrait, IdenStatic};
use sea_orm::sea_query::{DynIden, Expr, IntoIden, Order, SimpleExpr};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::ApiError;
use crate::meta::iden_name;

/// Prefix that turns an ordering field into a descending one (`-title`).
const DESC_PREFIX: char = '-';

/// Column plus direction. The column may belong to a related entity.
#[derive(Debug, Clone)]
pub struct OrderBy {
    table: DynIden,
    column: DynIden,
    order: Order,
}

impl OrderBy {
    pub fn new<C: ColumnTrait>(column: C, order: Order) -> Self {
        Self {
            table: column.entity_name(),
            column: column.into_iden(),
            order,
        }
    }

    pub fn asc<C: ColumnTrait>(column: C) -> Self {
        Self::new(column, Order::Asc)
    }

    pub fn desc<C: ColumnTrait>(column: C) -> Self {
        Self::new(column, Order::Desc)
    }

    #[must_use]
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn table_name(&self) -> String {
        iden_name(&self.table)
    }

    #[must_use]
    pub fn column_name(&self) -> String {
        iden_name(&self.column)
    }

    #[must_use]
    pub fn is_desc(&self) -> bool {
        matches!(self.order, Order::Desc)
    }

    pub(crate) fn table(&self) -> &DynIden {
        &self.table
    }

    pub(crate) fn expr(&self) -> SimpleExpr {
        Expr::col((self.table.clone(), self.column.clone())).into()
    }

    pub(crate) fn order(&self) -> Order {
        self.order.clone()
    }
}

/// Whitelist of the fields a client may order by.
///
/// ```rust,ignore
/// static ORDERING: LazyLock<OrderingFields> = LazyLock::new(|| {
///     OrderingFields::from_columns([child::Column::Title, child::Column::CreatedAt])
///         .field("parent_title", parent::Column::Title)
/// });
///
/// let order_by = ORDERING.parse(query.order_by.as_deref())?; // "-title" -> title DESC
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderingFields {
    fields: Vec<(String, OrderBy)>,
}

impl OrderingFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields named after the columns themselves.
    pub fn from_columns<C, I>(columns: I) -> Self
    where
        C: ColumnTrait,
        I: IntoIterator<Item = C>,
    {
        columns
            .into_iter()
            .fold(Self::new(), |fields, column| fields.field(column.as_str(), column))
    }

    #[must_use]
    pub fn field<C: ColumnTrait>(mut self, name: impl Into<String>, column: C) -> Self {
        self.fields.push((name.into(), OrderBy::asc(column)));
        self
    }

    /// Every accepted value: `name` and `-name` for each field.
    #[must_use]
    pub fn allowed(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|(name, _)| [name.clone(), format!("{DESC_PREFIX}{name}")])
            .collect()
    }

    /// Parses an `order_by` query value.
    ///
    /// # Errors
    ///
    /// Returns a 422 error listing the accepted values when `raw` names an unknown field.
    pub fn parse(&self, raw: Option<&str>) -> Result<Option<OrderBy>, ApiError> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        let (name, order) = match raw.strip_prefix(DESC_PREFIX) {
            Some(name) => (name, Order::Desc),
            None => (raw, Order::Asc),
        };
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, order_by)| Some(order_by.clone().with_order(order)))
            .ok_or_else(|| {
                ApiError::unprocessable(format!(
                    "Invalid order_by value '{raw}', expected one of: {}",
                    self.allowed().join(", ")
                ))
            })
    }
}

/// `?order_by=title` / `?order_by=-title` query parameter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderingQuery {
    /// Field to order by, prefixed with `-` for descending order
    pub order_by: Option<String>,
}
