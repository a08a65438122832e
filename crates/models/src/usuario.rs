use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cliente;
use crate::errors::ModelError;

pub const TIPO_CLIENTE: &str = "Cliente";
pub const TIPO_CONSULTOR: &str = "Consultor";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuario")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub idade: Option<i32>,
    pub endereco: Option<String>,
    pub tipo: String,
    pub criado_em: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Cliente,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Cliente => Entity::has_many(cliente::Entity).into(),
        }
    }
}

impl Related<cliente::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cliente.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert payload. `tipo` defaults to `Cliente` when absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewUsuario {
    pub nome: String,
    pub email: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub idade: Option<i32>,
    pub endereco: Option<String>,
    pub tipo: Option<String>,
}

pub fn validate_nome(n: &str) -> Result<(), ModelError> {
    if n.trim().is_empty() {
        return Err(ModelError::Validation("nome required".into()));
    }
    Ok(())
}

pub fn validate_email(e: &str) -> Result<(), ModelError> {
    if !e.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_tipo(t: &str) -> Result<(), ModelError> {
    if t != TIPO_CLIENTE && t != TIPO_CONSULTOR {
        return Err(ModelError::Validation(format!(
            "invalid tipo '{}' (expected {} or {})",
            t, TIPO_CLIENTE, TIPO_CONSULTOR
        )));
    }
    Ok(())
}

pub fn validate_telefone(t: &str) -> Result<(), ModelError> {
    if t.trim().is_empty() {
        return Err(ModelError::Validation("telefone required".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(conn: &C, input: &NewUsuario) -> Result<Model, ModelError> {
    validate_nome(&input.nome)?;
    validate_email(&input.email)?;
    let tipo = match input.tipo.as_deref() {
        Some(t) => {
            validate_tipo(t)?;
            t.to_string()
        }
        None => TIPO_CLIENTE.to_string(),
    };
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        nome: Set(input.nome.clone()),
        email: Set(input.email.clone()),
        telefone: Set(input.telefone.clone()),
        cpf: Set(input.cpf.clone()),
        idade: Set(input.idade),
        endereco: Set(input.endereco.clone()),
        tipo: Set(tipo),
        criado_em: Set(Utc::now().into()),
    };
    am.insert(conn).await.map_err(ModelError::from_db)
}

pub async fn find_by_cpf<C: ConnectionTrait>(conn: &C, cpf: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Cpf.eq(cpf))
        .one(conn)
        .await
        .map_err(ModelError::from_db)
}
