pub mod category {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "category")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub created_at: DateTimeUtc,
        #[sea_orm(unique)]
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl Related<super::parent::Entity> for Entity {
        fn to() -> RelationDef {
            super::category_parent::Relation::Parent.def()
        }

        fn via() -> Option<RelationDef> {
            Some(super::category_parent::Relation::Category.def().rev())
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod category_parent {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "category_parent")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub category_id: Uuid,
        #[sea_orm(primary_key, auto_increment = false)]
        pub parent_id: Uuid,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::category::Entity",
            from = "Column::CategoryId",
            to = "super::category::Column::Id"
        )]
        Category,
        #[sea_orm(
            belongs_to = "super::parent::Entity",
            from = "Column::ParentId",
            to = "super::parent::Column::Id"
        )]
        Parent,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod parent {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "parent")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub created_at: DateTimeUtc,
        pub title: String,
        #[sea_orm(unique)]
        pub slug: String,
        pub description: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::child::Entity")]
        Children,
    }

    impl Related<super::child::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Children.def()
        }
    }

    impl Related<super::category::Entity> for Entity {
        fn to() -> RelationDef {
            super::category_parent::Relation::Category.def()
        }

        fn via() -> Option<RelationDef> {
            Some(super::category_parent::Relation::Parent.def().rev())
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod child {
    use axum_sea_toolkit::base::set_if_some;
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "child")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub created_at: DateTimeUtc,
        pub title: String,
        #[sea_orm(unique)]
        pub slug: String,
        pub parent_id: Uuid,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::parent::Entity",
            from = "Column::ParentId",
            to = "super::parent::Column::Id"
        )]
        Parent,
    }

    impl Related<super::parent::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Parent.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    /// Request body for `POST /children`.
    #[derive(Debug, Clone, Deserialize, DeriveIntoActiveModel)]
    pub struct ChildCreate {
        pub title: String,
        pub slug: String,
        pub parent_id: Uuid,
    }

    /// Request body for `PATCH /children/{id}`; omitted fields stay unchanged.
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct ChildUpdate {
        pub title: Option<String>,
        pub slug: Option<String>,
        pub parent_id: Option<Uuid>,
    }

    impl IntoActiveModel<ActiveModel> for ChildUpdate {
        fn into_active_model(self) -> ActiveModel {
            ActiveModel {
                title: set_if_some(self.title),
                slug: set_if_some(self.slug),
                parent_id: set_if_some(self.parent_id),
                ..Default::default()
            }
        }
    }
}
