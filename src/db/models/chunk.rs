//! Chunk entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kb_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub doc_id: Uuid,

    /// Zero-based reading order within the document
    pub chunk_index: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// pgvector embedding stored as text for SeaORM compatibility;
    /// vector operations go through raw SQL. NULL when embedding failed
    /// or was skipped.
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::doc::Entity",
        from = "Column::DocId",
        to = "super::doc::Column::Id",
        on_delete = "Cascade"
    )]
    Doc,
}

impl Related<super::doc::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Doc.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
