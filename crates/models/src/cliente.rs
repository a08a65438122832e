use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::usuario;

/// Named client reference owned by a Consultor. Rows have no lifecycle of
/// their own: replaced wholesale on update, cascade-dropped on delete.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cliente")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub consultor_id: Uuid,
    pub nome: String,
    pub criado_em: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Usuario,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Usuario => Entity::belongs_to(usuario::Entity)
                .from(Column::ConsultorId)
                .to(usuario::Column::Id)
                .into(),
        }
    }
}

impl Related<usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    consultor_id: Uuid,
    nome: &str,
) -> Result<Model, ModelError> {
    if nome.trim().is_empty() {
        return Err(ModelError::Validation("cliente nome required".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        consultor_id: Set(consultor_id),
        nome: Set(nome.to_string()),
        criado_em: Set(Utc::now().into()),
    };
    am.insert(conn).await.map_err(ModelError::from_db)
}
