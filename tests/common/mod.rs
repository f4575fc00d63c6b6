#![allow(dead_code)]

use std::sync::LazyLock;

use axum::Router;
use axum_sea_toolkit::base::base_table;
use axum_sea_toolkit::{ModelManager, OrderBy, OrderingFields, UniqueConstraint};
use sea_orm::{ActiveValue::Set, Database, DatabaseConnection, DbErr, RelationTrait};
use sea_orm_migration::prelude::*;
use uuid::Uuid;

pub mod child_api;
pub mod entities;

use entities::{category, category_parent, child, parent};

pub static CATEGORIES: LazyLock<ModelManager<category::Entity>> =
    LazyLock::new(ModelManager::new);

pub static PARENTS: LazyLock<ModelManager<parent::Entity>> = LazyLock::new(|| {
    ModelManager::new()
        .with_unique_constraint(UniqueConstraint::new([
            parent::Column::Title,
            parent::Column::Description,
        ]))
        .with_many_to_many(
            "categories",
            category_parent::Relation::Parent.def(),
            category_parent::Relation::Category.def(),
        )
});

pub static CHILDREN: LazyLock<ModelManager<child::Entity>> = LazyLock::new(|| {
    ModelManager::new().with_default_ordering(OrderBy::asc(child::Column::Title))
});

pub static CHILD_ORDERING: LazyLock<OrderingFields> = LazyLock::new(|| {
    OrderingFields::from_columns([child::Column::Title, child::Column::Slug])
        .field("parent_title", parent::Column::Title)
});

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    use child_api::{
        create_child, delete_child, list_children, retrieve_child, update_child,
    };

    let api = Router::new()
        .route(
            "/children",
            axum::routing::get(list_children).post(create_child),
        )
        .route(
            "/children/{id}",
            axum::routing::get(retrieve_child)
                .patch(update_child)
                .delete(delete_child),
        )
        .with_state(db);

    Router::new().nest("/api/v1", api)
}

// ============================================================================
// Seed helpers
// ============================================================================

pub async fn create_parent(
    db: &DatabaseConnection,
    title: &str,
    slug: &str,
    description: Option<&str>,
) -> parent::Model {
    PARENTS
        .create(
            db,
            parent::ActiveModel {
                title: Set(title.to_string()),
                slug: Set(slug.to_string()),
                description: Set(description.map(str::to_string)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create parent")
}

pub async fn create_child(
    db: &DatabaseConnection,
    title: &str,
    slug: &str,
    parent_id: Uuid,
) -> child::Model {
    CHILDREN
        .create(
            db,
            child::ActiveModel {
                title: Set(title.to_string()),
                slug: Set(slug.to_string()),
                parent_id: Set(parent_id),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create child")
}

pub async fn create_category(db: &DatabaseConnection, title: &str) -> category::Model {
    CATEGORIES
        .create(
            db,
            category::ActiveModel {
                title: Set(title.to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create category")
}

// ============================================================================
// Migrations
// ============================================================================

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables)]
    }
}

pub struct CreateTables;

#[async_trait::async_trait]
impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                base_table(category::Entity)
                    .col(
                        ColumnDef::new(category::Column::Title)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                base_table(parent::Entity)
                    .col(ColumnDef::new(parent::Column::Title).string().not_null())
                    .col(
                        ColumnDef::new(parent::Column::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(parent::Column::Description).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parent_title_description")
                    .table(parent::Entity)
                    .col(parent::Column::Title)
                    .col(parent::Column::Description)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                base_table(child::Entity)
                    .col(ColumnDef::new(child::Column::Title).string().not_null())
                    .col(
                        ColumnDef::new(child::Column::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(child::Column::ParentId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(child::Entity, child::Column::ParentId)
                            .to(parent::Entity, parent::Column::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(category_parent::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(category_parent::Column::CategoryId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(category_parent::Column::ParentId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(category_parent::Column::CategoryId)
                            .col(category_parent::Column::ParentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(category_parent::Entity, category_parent::Column::CategoryId)
                            .to(category::Entity, category::Column::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(category_parent::Entity, category_parent::Column::ParentId)
                            .to(parent::Entity, parent::Column::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            category_parent::Entity.into_table_ref(),
            child::Entity.into_table_ref(),
            parent::Entity.into_table_ref(),
            category::Entity.into_table_ref(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}
