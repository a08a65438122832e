use std::collections::HashSet;

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, LoaderTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::filters::{self, UserFilter};
use models::errors::ModelError;
use models::{cliente, usuario};

/// Usuario plus its owned client references (empty for non-consultors).
#[derive(Clone, Debug, Serialize)]
pub struct UsuarioComClientes {
    #[serde(flatten)]
    pub usuario: usuario::Model,
    pub clientes: Vec<cliente::Model>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UsuarioCounts {
    pub total: u64,
    #[serde(rename = "last7Days")]
    pub last7_days: u64,
}

/// Partial update; only supplied fields change. A supplied `clientes` list
/// replaces the whole prior association set.
#[derive(Clone, Debug, Default)]
pub struct UsuarioChanges {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub idade: Option<i32>,
    pub endereco: Option<String>,
    pub tipo: Option<String>,
    pub clientes: Option<Vec<String>>,
}

fn db_err(e: sea_orm::DbErr) -> ServiceError {
    ServiceError::Db(e.to_string())
}

/// Create a usuario, inserting any client references in the same transaction.
pub async fn create_usuario(
    db: &DatabaseConnection,
    input: &usuario::NewUsuario,
    clientes: &[String],
) -> Result<UsuarioComClientes, ServiceError> {
    if clientes.is_empty() {
        let created = usuario::create(db, input).await?;
        return Ok(UsuarioComClientes { usuario: created, clientes: Vec::new() });
    }

    let txn = db.begin().await.map_err(db_err)?;
    let created = usuario::create(&txn, input).await?;
    let mut rows = Vec::with_capacity(clientes.len());
    for nome in clientes {
        rows.push(cliente::create(&txn, created.id, nome).await?);
    }
    txn.commit().await.map_err(db_err)?;
    Ok(UsuarioComClientes { usuario: created, clientes: rows })
}

/// Create a Consultor. Besides the base validation, nome, email and
/// telefone are mandatory for this variant.
pub async fn create_consultor(
    db: &DatabaseConnection,
    input: &usuario::NewUsuario,
    clientes: &[String],
) -> Result<UsuarioComClientes, ServiceError> {
    usuario::validate_nome(&input.nome)?;
    usuario::validate_email(&input.email)?;
    match input.telefone.as_deref() {
        Some(t) => usuario::validate_telefone(t)?,
        None => return Err(ServiceError::Validation("telefone required".into())),
    }

    let mut input = input.clone();
    input.tipo = Some(usuario::TIPO_CONSULTOR.to_string());
    create_usuario(db, &input, clientes).await
}

/// List usuarios matching the filter, newest first, with client references.
pub async fn list_usuarios(
    db: &DatabaseConnection,
    filter: &UserFilter,
) -> Result<Vec<UsuarioComClientes>, ServiceError> {
    let users = usuario::Entity::find()
        .filter(filter.condition())
        .order_by_desc(usuario::Column::CriadoEm)
        .all(db)
        .await
        .map_err(db_err)?;
    with_clientes(db, users).await
}

/// Total record count plus the trailing-7-day count, optionally scoped to a tipo.
pub async fn count_usuarios(
    db: &DatabaseConnection,
    tipo: Option<&str>,
) -> Result<UsuarioCounts, ServiceError> {
    let mut base = usuario::Entity::find();
    if let Some(t) = tipo {
        usuario::validate_tipo(t)?;
        base = base.filter(usuario::Column::Tipo.eq(t));
    }

    let total = base.clone().count(db).await.map_err(db_err)?;
    let seven_days_ago = Utc::now() - Duration::days(7);
    let last7_days = base
        .filter(usuario::Column::CriadoEm.gte(seven_days_ago))
        .count(db)
        .await
        .map_err(db_err)?;
    Ok(UsuarioCounts { total, last7_days })
}

/// Get a usuario by id.
pub async fn get_usuario(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<UsuarioComClientes>, ServiceError> {
    let found = usuario::Entity::find_by_id(id).one(db).await.map_err(db_err)?;
    match found {
        Some(u) => Ok(with_clientes(db, vec![u]).await?.pop()),
        None => Ok(None),
    }
}

/// Get a usuario by its national ID.
pub async fn get_usuario_by_cpf(
    db: &DatabaseConnection,
    cpf: &str,
) -> Result<Option<UsuarioComClientes>, ServiceError> {
    match usuario::find_by_cpf(db, cpf).await? {
        Some(u) => Ok(with_clientes(db, vec![u]).await?.pop()),
        None => Ok(None),
    }
}

/// Partial update by id.
pub async fn update_usuario(
    db: &DatabaseConnection,
    id: Uuid,
    changes: &UsuarioChanges,
) -> Result<UsuarioComClientes, ServiceError> {
    let found = usuario::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::not_found("usuario"))?;
    apply_changes(db, found, changes).await
}

/// Partial update by national ID.
pub async fn update_usuario_by_cpf(
    db: &DatabaseConnection,
    cpf: &str,
    changes: &UsuarioChanges,
) -> Result<UsuarioComClientes, ServiceError> {
    let found = usuario::find_by_cpf(db, cpf)
        .await?
        .ok_or_else(|| ServiceError::not_found("usuario"))?;
    apply_changes(db, found, changes).await
}

/// Delete a usuario by id; returns whether a record was removed.
/// Client references cascade at the storage level.
pub async fn delete_usuario(db: &DatabaseConnection, id: Uuid) -> Result<bool, ServiceError> {
    let res = usuario::Entity::delete_by_id(id).exec(db).await.map_err(db_err)?;
    Ok(res.rows_affected > 0)
}

/// Delete a usuario by national ID; returns whether a record was removed.
pub async fn delete_usuario_by_cpf(db: &DatabaseConnection, cpf: &str) -> Result<bool, ServiceError> {
    match usuario::find_by_cpf(db, cpf).await? {
        Some(u) => delete_usuario(db, u.id).await,
        None => Ok(false),
    }
}

/// Usuarios referenced as clients of a Consultor looked up by exact nome
/// and/or email. When both keys are given the two client sets intersect.
/// An unknown consultor yields an empty list, never an error.
pub async fn list_clientes_by_consultor(
    db: &DatabaseConnection,
    nome: Option<&str>,
    email: Option<&str>,
    data: Option<NaiveDate>,
) -> Result<Vec<UsuarioComClientes>, ServiceError> {
    let by_nome = match nome {
        Some(n) => Some(consultor_cliente_names(db, usuario::Column::Nome, n).await?),
        None => None,
    };
    let by_email = match email {
        Some(e) => Some(consultor_cliente_names(db, usuario::Column::Email, e).await?),
        None => None,
    };

    let names: HashSet<String> = match (by_nome, by_email) {
        (Some(a), Some(b)) => a.intersection(&b).cloned().collect(),
        (Some(set), None) | (None, Some(set)) => set,
        (None, None) => {
            return Err(ServiceError::Validation("nome or email required".into()));
        }
    };
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut cond = Condition::all().add(usuario::Column::Nome.is_in(names.iter().cloned()));
    if let Some(date) = data {
        let (start, end) = filters::local_day_range(date);
        cond = cond
            .add(usuario::Column::CriadoEm.gte(start))
            .add(usuario::Column::CriadoEm.lt(end));
    }

    let users = usuario::Entity::find()
        .filter(cond)
        .order_by_desc(usuario::Column::CriadoEm)
        .all(db)
        .await
        .map_err(db_err)?;
    with_clientes(db, users).await
}

/// Client-name set of the consultor matched exactly on one column.
async fn consultor_cliente_names(
    db: &DatabaseConnection,
    col: usuario::Column,
    value: &str,
) -> Result<HashSet<String>, ServiceError> {
    let found = usuario::Entity::find()
        .filter(usuario::Column::Tipo.eq(usuario::TIPO_CONSULTOR))
        .filter(col.eq(value))
        .one(db)
        .await
        .map_err(db_err)?;
    let Some(consultor) = found else {
        return Ok(HashSet::new());
    };
    let rows = cliente::Entity::find()
        .filter(cliente::Column::ConsultorId.eq(consultor.id))
        .all(db)
        .await
        .map_err(db_err)?;
    Ok(rows.into_iter().map(|c| c.nome).collect())
}

async fn with_clientes(
    db: &DatabaseConnection,
    users: Vec<usuario::Model>,
) -> Result<Vec<UsuarioComClientes>, ServiceError> {
    let clientes = users.load_many(cliente::Entity, db).await.map_err(db_err)?;
    Ok(users
        .into_iter()
        .zip(clientes)
        .map(|(usuario, clientes)| UsuarioComClientes { usuario, clientes })
        .collect())
}

async fn apply_changes(
    db: &DatabaseConnection,
    current: usuario::Model,
    changes: &UsuarioChanges,
) -> Result<UsuarioComClientes, ServiceError> {
    // Validate the incoming values before touching the row
    if let Some(nome) = changes.nome.as_deref() {
        usuario::validate_nome(nome)?;
    }
    if let Some(email) = changes.email.as_deref() {
        usuario::validate_email(email)?;
    }
    if let Some(tipo) = changes.tipo.as_deref() {
        usuario::validate_tipo(tipo)?;
    }

    let id = current.id;
    let snapshot = current.clone();
    let txn = db.begin().await.map_err(db_err)?;

    let mut am: usuario::ActiveModel = current.into();
    let mut dirty = false;
    if let Some(v) = &changes.nome {
        am.nome = Set(v.clone());
        dirty = true;
    }
    if let Some(v) = &changes.email {
        am.email = Set(v.clone());
        dirty = true;
    }
    if let Some(v) = &changes.telefone {
        am.telefone = Set(Some(v.clone()));
        dirty = true;
    }
    if let Some(v) = &changes.cpf {
        am.cpf = Set(Some(v.clone()));
        dirty = true;
    }
    if let Some(v) = changes.idade {
        am.idade = Set(Some(v));
        dirty = true;
    }
    if let Some(v) = &changes.endereco {
        am.endereco = Set(Some(v.clone()));
        dirty = true;
    }
    if let Some(v) = &changes.tipo {
        am.tipo = Set(v.clone());
        dirty = true;
    }
    // criado_em is immutable once assigned

    let updated = if dirty {
        am.update(&txn).await.map_err(ModelError::from_db)?
    } else {
        snapshot
    };

    // Destructive replace of the association set, inside the same transaction
    let replaced = if let Some(names) = &changes.clientes {
        cliente::Entity::delete_many()
            .filter(cliente::Column::ConsultorId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let mut rows = Vec::with_capacity(names.len());
        for nome in names {
            rows.push(cliente::create(&txn, id, nome).await?);
        }
        Some(rows)
    } else {
        None
    };

    txn.commit().await.map_err(db_err)?;

    let clientes = match replaced {
        Some(rows) => {
            info!(usuario_id = %id, count = rows.len(), "replaced cliente associations");
            rows
        }
        None => cliente::Entity::find()
            .filter(cliente::Column::ConsultorId.eq(id))
            .all(db)
            .await
            .map_err(db_err)?,
    };

    Ok(UsuarioComClientes { usuario: updated, clientes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn unique(prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4().simple())
    }

    fn new_usuario(nome: String, email: String) -> usuario::NewUsuario {
        usuario::NewUsuario {
            nome,
            email,
            telefone: Some(unique("tel")[..20].to_string()),
            cpf: Some(unique("cpf")[..14].to_string()),
            idade: Some(28),
            endereco: Some("Av. Central, 42".to_string()),
            tipo: None,
        }
    }

    #[tokio::test]
    async fn usuario_crud_service() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let email = format!("svc_{}@example.com", Uuid::new_v4());
        let created = create_usuario(&db, &new_usuario(unique("Svc"), email.clone()), &[]).await?;
        assert_eq!(created.usuario.email, email);
        assert!(created.clientes.is_empty());

        let found = get_usuario(&db, created.usuario.id).await?.unwrap();
        assert_eq!(found.usuario.id, created.usuario.id);

        let by_cpf = get_usuario_by_cpf(&db, created.usuario.cpf.as_deref().unwrap()).await?;
        assert_eq!(by_cpf.unwrap().usuario.id, created.usuario.id);

        let changes = UsuarioChanges { nome: Some("Novo Nome".into()), ..Default::default() };
        let updated = update_usuario(&db, created.usuario.id, &changes).await?;
        assert_eq!(updated.usuario.nome, "Novo Nome");
        assert_eq!(updated.usuario.email, email);
        assert_eq!(updated.usuario.criado_em, created.usuario.criado_em);

        assert!(delete_usuario(&db, created.usuario.id).await?);
        assert!(get_usuario(&db, created.usuario.id).await?.is_none());
        assert!(!delete_usuario(&db, created.usuario.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn update_of_missing_usuario_is_not_found() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let changes = UsuarioChanges { nome: Some("x".into()), ..Default::default() };
        let res = update_usuario(&db, Uuid::new_v4(), &changes).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn list_filter_matches_case_insensitively() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let marker = Uuid::new_v4().simple().to_string();
        let nome = format!("MAIUSCULO_{}", marker);
        let created = create_usuario(
            &db,
            &new_usuario(nome, format!("filter_{}@example.com", marker)),
            &[],
        )
        .await?;

        let filter = UserFilter {
            nome: Some(format!("maiusculo_{}", marker)),
            ..Default::default()
        };
        let found = list_usuarios(&db, &filter).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].usuario.id, created.usuario.id);

        delete_usuario(&db, created.usuario.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn newest_records_come_first() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let marker = Uuid::new_v4().simple().to_string();
        let first = create_usuario(
            &db,
            &new_usuario(format!("ord_a_{}", marker), format!("ord_a_{}@example.com", marker)),
            &[],
        )
        .await?;
        let second = create_usuario(
            &db,
            &new_usuario(format!("ord_b_{}", marker), format!("ord_b_{}@example.com", marker)),
            &[],
        )
        .await?;

        let filter = UserFilter {
            nome: Some("ord_".to_string()),
            email: Some(format!("{}@", marker)),
            data: None,
        };
        let listed = list_usuarios(&db, &filter).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].usuario.id, second.usuario.id);
        assert_eq!(listed[1].usuario.id, first.usuario.id);

        delete_usuario(&db, first.usuario.id).await?;
        delete_usuario(&db, second.usuario.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn counts_cover_the_trailing_week() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let created = create_usuario(
            &db,
            &new_usuario(unique("count"), format!("count_{}@example.com", Uuid::new_v4())),
            &[],
        )
        .await?;

        let counts = count_usuarios(&db, None).await?;
        assert!(counts.total >= 1);
        assert!(counts.total >= counts.last7_days);
        // the record just created is inside the window
        assert!(counts.last7_days >= 1);

        assert!(matches!(
            count_usuarios(&db, Some("Gerente")).await,
            Err(ServiceError::Validation(_))
        ));

        delete_usuario(&db, created.usuario.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn consultor_flow_replaces_client_set() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let marker = Uuid::new_v4().simple().to_string();
        let cli_a = format!("cli_a_{}", marker);
        let cli_b = format!("cli_b_{}", marker);
        let cli_x = format!("cli_x_{}", marker);

        // client usuarios the lookup should resolve to
        let mut keep = Vec::new();
        for nome in [&cli_a, &cli_b, &cli_x] {
            keep.push(
                create_usuario(
                    &db,
                    &new_usuario(nome.clone(), format!("{}@example.com", nome)),
                    &[],
                )
                .await?,
            );
        }

        let consultor_nome = format!("consultor_{}", marker);
        let consultor_email = format!("{}@example.com", consultor_nome);
        let consultor = create_consultor(
            &db,
            &new_usuario(consultor_nome.clone(), consultor_email.clone()),
            &[cli_a.clone(), cli_b.clone()],
        )
        .await?;
        assert_eq!(consultor.usuario.tipo, usuario::TIPO_CONSULTOR);
        assert_eq!(consultor.clientes.len(), 2);

        let listed =
            list_clientes_by_consultor(&db, Some(&consultor_nome), None, None).await?;
        let mut nomes: Vec<_> = listed.iter().map(|u| u.usuario.nome.clone()).collect();
        nomes.sort();
        assert_eq!(nomes, vec![cli_a.clone(), cli_b.clone()]);

        // intersection of the nome and email lookups
        let both = list_clientes_by_consultor(
            &db,
            Some(&consultor_nome),
            Some(&consultor_email),
            None,
        )
        .await?;
        assert_eq!(both.len(), 2);

        // destructive replace: only the new association survives
        let changes = UsuarioChanges {
            clientes: Some(vec![cli_x.clone()]),
            ..Default::default()
        };
        let updated = update_usuario(&db, consultor.usuario.id, &changes).await?;
        assert_eq!(updated.clientes.len(), 1);
        assert_eq!(updated.clientes[0].nome, cli_x);

        let after = list_clientes_by_consultor(&db, Some(&consultor_nome), None, None).await?;
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].usuario.nome, cli_x);

        // unknown consultor is an empty list, not an error
        let unknown =
            list_clientes_by_consultor(&db, Some("nobody-by-this-name"), None, None).await?;
        assert!(unknown.is_empty());

        // no lookup key at all is a validation failure
        assert!(matches!(
            list_clientes_by_consultor(&db, None, None, None).await,
            Err(ServiceError::Validation(_))
        ));

        delete_usuario(&db, consultor.usuario.id).await?;
        for u in keep {
            delete_usuario(&db, u.usuario.id).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn consultor_requires_telefone() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = get_db().await?;

        let mut input = new_usuario(unique("cons"), format!("cons_{}@example.com", Uuid::new_v4()));
        input.telefone = None;
        let res = create_consultor(&db, &input, &[]).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        Ok(())
    }
}
