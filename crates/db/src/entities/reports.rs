//! `SeaORM` Entity for reports table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    #[sea_orm(unique)]
    pub external_id: String,
    pub title: String,
    pub kind: String,
    pub period_from: Date,
    pub period_to: Date,
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Json,
    pub department_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary")]
    pub employee_ids: Json,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub summary: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub analysis: Option<Json>,
    #[sea_orm(column_type = "JsonBinary")]
    pub expense_ids: Json,
    pub document_location: Option<String>,
    pub error_detail: Option<String>,
    pub render_error: Option<String>,
    pub generated_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
