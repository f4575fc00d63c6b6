//! Field filters: a comparison value paired with an operator, an optional SQL function and a
//! column of the managed entity or of a related one.
//!
//! ```rust,ignore
//! // GET /children?title=ali&parent_title=bob&created=2024-01-01
//! CHILDREN.query()
//!     .field(FieldFilter::new(child::Column::Title, query.title).operator(Operator::ILike))
//!     .field(FieldFilter::new(parent::Column::Title, query.parent_title))
//!     .field(FieldFilter::new(child::Column::CreatedAt, query.created).function(FieldFunc::Date))
//! ```
//!
//! A filter built from `None` is skipped, so optional query parameters can be passed as is.

use std::fmt;
use std::str::FromStr;

use sea_orm::ColumnTrait;
use sea_orm::Value;
use sea_orm::sea_query::{Alias, DynIden, Expr, Func, IntoIden, SimpleExpr};
use serde::{Deserialize, Deserializer, de};

use crate::base::display_value;
use crate::errors::ApiError;
use crate::meta::iden_name;

/// Query-string values that mean "compare with NULL" when parsed with `FromStr` or serde.
pub const NULL_QUERY_VALUES: [&str; 1] = [""];

/// Comparison operators for field filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Equality (=)
    #[default]
    Eq,
    /// Not equal (<>)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// LIKE with the pattern given as is
    Like,
    /// Case-insensitive substring match, `UPPER(col) LIKE '%VALUE%'`
    ILike,
    /// IN (list of values)
    In,
    /// NOT IN (list of values)
    NotIn,
}

impl Operator {
    /// Parse operator from field name suffix (e.g., "_gte", "_lte")
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "_gte" => Some(Self::Gte),
            "_lte" => Some(Self::Lte),
            "_gt" => Some(Self::Gt),
            "_lt" => Some(Self::Lt),
            "_neq" => Some(Self::Ne),
            "_like" => Some(Self::ILike),
            _ => None,
        }
    }

    /// Splits `priority_gte` into `("priority", Gte)`; names without a suffix compare with `Eq`.
    #[must_use]
    pub fn split_field(field: &str) -> (&str, Self) {
        ["_gte", "_lte", "_gt", "_lt", "_neq", "_like"]
            .into_iter()
            .find_map(|suffix| Some((field.strip_suffix(suffix)?, Self::from_suffix(suffix)?)))
            .unwrap_or((field, Self::Eq))
    }

    /// Get the suffix for this operator
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Eq | Self::Like | Self::In | Self::NotIn => "",
            Self::Ne => "_neq",
            Self::Gt => "_gt",
            Self::Gte => "_gte",
            Self::Lt => "_lt",
            Self::Lte => "_lte",
            Self::ILike => "_like",
        }
    }
}

impl FromStr for Operator {
    type Err = ApiError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "eq" | "__eq__" => Ok(Self::Eq),
            "ne" | "__ne__" => Ok(Self::Ne),
            "gt" | "__gt__" => Ok(Self::Gt),
            "ge" | "gte" | "__ge__" => Ok(Self::Gte),
            "lt" | "__lt__" => Ok(Self::Lt),
            "le" | "lte" | "__le__" => Ok(Self::Lte),
            "like" => Ok(Self::Like),
            "ilike" => Ok(Self::ILike),
            "in" | "in_" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            other => Err(ApiError::unprocessable(format!("Unknown filter operator '{other}'"))),
        }
    }
}

/// SQL function applied to the column before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFunc {
    /// `DATE(col)`, compare a timestamp with a date
    Date,
    Lower,
    Upper,
}

impl FieldFunc {
    fn apply(self, expr: SimpleExpr) -> SimpleExpr {
        match self {
            Self::Date => Func::cust(Alias::new("DATE")).arg(expr).into(),
            Self::Lower => Func::lower(expr).into(),
            Self::Upper => Func::upper(expr).into(),
        }
    }
}

/// A query parameter that can ask for NULL explicitly.
///
/// `?parent_id=` deserializes to [`NullableQuery::Null`]; any other value is parsed as `T`,
/// so `?title=null` still searches for the string. Use [`parse_with`](Self::parse_with) to
/// accept other markers. Wrap the field in `Option` so a missing parameter stays `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullableQuery<T> {
    Null,
    Value(T),
}

impl<T: FromStr> NullableQuery<T> {
    /// Parses `raw`, treating any of `null_values` as NULL.
    ///
    /// ```rust,ignore
    /// let value = NullableQuery::<Uuid>::parse_with(raw, &["", "null", "none"])?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the parse error of `T`.
    pub fn parse_with(raw: &str, null_values: &[&str]) -> Result<Self, T::Err> {
        if null_values.contains(&raw) {
            Ok(Self::Null)
        } else {
            raw.parse().map(Self::Value)
        }
    }
}

impl<T: FromStr> FromStr for NullableQuery<T> {
    type Err = T::Err;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse_with(raw, &NULL_QUERY_VALUES)
    }
}

impl<'de, T> Deserialize<'de> for NullableQuery<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Absent,
    Null,
    Single(Value),
    Many(Vec<Value>),
}

/// A filter on a column of the managed entity or of a related entity.
///
/// Columns of another table make the manager join that table through the matching relation.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    table: DynIden,
    column: DynIden,
    value: FilterValue,
    operator: Operator,
    function: Option<FieldFunc>,
}

impl FieldFilter {
    fn on<C: ColumnTrait>(column: C, value: FilterValue, operator: Operator) -> Self {
        Self {
            table: column.entity_name(),
            column: column.into_iden(),
            value,
            operator,
            function: None,
        }
    }

    /// Equality filter, skipped when `value` is `None`.
    pub fn new<C, V>(column: C, value: Option<V>) -> Self
    where
        C: ColumnTrait,
        V: Into<Value>,
    {
        let value = value.map_or(FilterValue::Absent, |v| FilterValue::Single(v.into()));
        Self::on(column, value, Operator::Eq)
    }

    /// Filter that compares with NULL when asked to, skipped when `value` is `None`.
    pub fn nullable<C, V>(column: C, value: Option<NullableQuery<V>>) -> Self
    where
        C: ColumnTrait,
        V: Into<Value>,
    {
        let value = match value {
            None => FilterValue::Absent,
            Some(NullableQuery::Null) => FilterValue::Null,
            Some(NullableQuery::Value(v)) => FilterValue::Single(v.into()),
        };
        Self::on(column, value, Operator::Eq)
    }

    /// `IN` filter, skipped when `values` is `None`.
    pub fn any_of<C, V, I>(column: C, values: Option<I>) -> Self
    where
        C: ColumnTrait,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let value = values.map_or(FilterValue::Absent, |vs| {
            FilterValue::Many(vs.into_iter().map(Into::into).collect())
        });
        Self::on(column, value, Operator::In)
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    #[must_use]
    pub fn function(mut self, function: FieldFunc) -> Self {
        self.function = Some(function);
        self
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.value == FilterValue::Absent
    }

    #[must_use]
    pub fn table_name(&self) -> String {
        iden_name(&self.table)
    }

    pub(crate) fn table(&self) -> &DynIden {
        &self.table
    }

    /// The SQL condition, `None` when the filter is skipped.
    #[must_use]
    pub fn condition(&self) -> Option<SimpleExpr> {
        let column: SimpleExpr = Expr::col((self.table.clone(), self.column.clone())).into();
        let target = match self.function {
            Some(function) => function.apply(column),
            None => column,
        };

        let expr = match (&self.value, self.operator) {
            (FilterValue::Absent, _) => return None,
            (FilterValue::Null, Operator::Ne | Operator::NotIn) => Expr::expr(target).is_not_null(),
            (FilterValue::Null, _) => Expr::expr(target).is_null(),
            (FilterValue::Many(values), Operator::NotIn | Operator::Ne) => {
                Expr::expr(target).is_not_in(values.iter().cloned())
            }
            (FilterValue::Many(values), _) => Expr::expr(target).is_in(values.iter().cloned()),
            (FilterValue::Single(value), operator) => compare(target, operator, value),
        };
        Some(expr)
    }
}

fn compare(target: SimpleExpr, operator: Operator, value: &Value) -> SimpleExpr {
    let value = value.clone();
    let expr = Expr::expr(target.clone());
    match operator {
        Operator::Eq | Operator::In => expr.eq(value),
        Operator::Ne | Operator::NotIn => expr.ne(value),
        Operator::Gt => expr.gt(value),
        Operator::Gte => expr.gte(value),
        Operator::Lt => expr.lt(value),
        Operator::Lte => expr.lte(value),
        Operator::Like => expr.like(pattern_text(&value)),
        Operator::ILike => Expr::expr(Func::upper(target))
            .like(format!("%{}%", pattern_text(&value).to_uppercase())),
    }
}

fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(Some(text)) => text.to_string(),
        other => display_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    mod item {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "item")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub title: String,
            pub owner_id: Option<i32>,
            pub created_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn where_sql(filter: &FieldFilter) -> Option<String> {
        filter.condition().map(|expr| {
            Query::select()
                .column(item::Column::Id)
                .from(item::Entity)
                .and_where(expr)
                .to_string(SqliteQueryBuilder)
        })
    }

    // ============================================================================
    // Operator Parsing
    // ============================================================================

    #[test]
    fn test_operator_names() {
        assert_eq!("__eq__".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("ilike".parse::<Operator>().unwrap(), Operator::ILike);
        assert_eq!("in_".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!("ge".parse::<Operator>().unwrap(), Operator::Gte);
        assert!("between".parse::<Operator>().is_err());
    }

    #[test]
    fn test_split_field_suffixes() {
        assert_eq!(Operator::split_field("priority_gte"), ("priority", Operator::Gte));
        assert_eq!(Operator::split_field("priority_gt"), ("priority", Operator::Gt));
        assert_eq!(Operator::split_field("title_like"), ("title", Operator::ILike));
        assert_eq!(Operator::split_field("title"), ("title", Operator::Eq));
        assert_eq!(Operator::Gte.suffix(), "_gte");
    }

    // ============================================================================
    // NullableQuery
    // ============================================================================

    #[test]
    fn test_nullable_query_parses_null_markers() {
        assert_eq!("".parse::<NullableQuery<i32>>().unwrap(), NullableQuery::Null);
        assert_eq!("7".parse::<NullableQuery<i32>>().unwrap(), NullableQuery::Value(7));
        assert!("seven".parse::<NullableQuery<i32>>().is_err());
    }

    #[test]
    fn test_nullable_query_literal_null_is_a_value() {
        assert_eq!(
            "null".parse::<NullableQuery<String>>().unwrap(),
            NullableQuery::Value("null".to_string())
        );
        assert_eq!(
            NullableQuery::<i32>::parse_with("null", &["", "null"]).unwrap(),
            NullableQuery::Null
        );
    }

    #[test]
    fn test_nullable_query_deserializes_from_json_string() {
        let parsed: NullableQuery<i32> = serde_json::from_str(r#""12""#).unwrap();
        assert_eq!(parsed, NullableQuery::Value(12));
        let parsed: NullableQuery<i32> = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(parsed, NullableQuery::Null);
    }

    // ============================================================================
    // Condition Building
    // ============================================================================

    #[test]
    fn test_absent_value_is_skipped() {
        let filter = FieldFilter::new(item::Column::Title, None::<String>);
        assert!(filter.is_absent());
        assert!(where_sql(&filter).is_none());
    }

    #[test]
    fn test_equality_is_table_qualified() {
        let filter = FieldFilter::new(item::Column::Title, Some("a"));
        assert_eq!(
            where_sql(&filter).unwrap(),
            r#"SELECT "id" FROM "item" WHERE "item"."title" = 'a'"#
        );
        assert_eq!(filter.table_name(), "item");
    }

    #[test]
    fn test_ilike_wraps_and_uppercases() {
        let filter = FieldFilter::new(item::Column::Title, Some("ab")).operator(Operator::ILike);
        assert_eq!(
            where_sql(&filter).unwrap(),
            r#"SELECT "id" FROM "item" WHERE UPPER("item"."title") LIKE '%AB%'"#
        );
    }

    #[test]
    fn test_nullable_null_compiles_to_is_null() {
        let filter = FieldFilter::nullable(item::Column::OwnerId, Some(NullableQuery::<i32>::Null));
        assert!(where_sql(&filter).unwrap().ends_with(r#""item"."owner_id" IS NULL"#));

        let filter = FieldFilter::nullable(item::Column::OwnerId, Some(NullableQuery::<i32>::Null))
            .operator(Operator::Ne);
        assert!(where_sql(&filter).unwrap().ends_with(r#""item"."owner_id" IS NOT NULL"#));
    }

    #[test]
    fn test_nullable_value_compares() {
        let filter = FieldFilter::nullable(item::Column::OwnerId, Some(NullableQuery::Value(3)))
            .operator(Operator::Gte);
        assert!(where_sql(&filter).unwrap().ends_with(r#""item"."owner_id" >= 3"#));
    }

    #[test]
    fn test_any_of_builds_in_list() {
        let filter = FieldFilter::any_of(item::Column::Id, Some(vec![1, 2]));
        assert!(where_sql(&filter).unwrap().ends_with(r#""item"."id" IN (1, 2)"#));

        let filter = FieldFilter::any_of(item::Column::Id, Some(vec![1])).operator(Operator::NotIn);
        assert!(where_sql(&filter).unwrap().ends_with(r#""item"."id" NOT IN (1)"#));
    }

    #[test]
    fn test_date_function_wraps_column() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let filter = FieldFilter::new(item::Column::CreatedAt, Some(day)).function(FieldFunc::Date);
        assert!(
            where_sql(&filter)
                .unwrap()
                .ends_with(r#"DATE("item"."created_at") = '2024-01-02'"#)
        );
    }
}
