use crate::db::connect;
use crate::errors::ModelError;
use crate::{cliente, usuario};
use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

/// Setup test database with migrations
async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect().await?;

    // Run migrations if needed
    migration::Migrator::up(&db, None).await?;

    Ok(db)
}

fn sample_usuario(email: String) -> usuario::NewUsuario {
    usuario::NewUsuario {
        nome: format!("Usuario {}", Uuid::new_v4()),
        email,
        telefone: Some(format!("11 9{}", &Uuid::new_v4().simple().to_string()[..8])),
        cpf: Some(Uuid::new_v4().simple().to_string()[..11].to_string()),
        idade: Some(30),
        endereco: Some("Rua A, 123".to_string()),
        tipo: None,
    }
}

/// Test usuario CRUD operations
#[tokio::test]
async fn test_usuario_crud() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let db = setup_test_db().await?;

    // Test Create
    let email = format!("test_{}@example.com", Uuid::new_v4());
    let input = sample_usuario(email.clone());
    let created = usuario::create(&db, &input).await?;

    assert_eq!(created.email, email);
    assert_eq!(created.tipo, usuario::TIPO_CLIENTE);

    println!("Created usuario: {:?}", created);

    // Test Read
    let found = usuario::Entity::find_by_id(created.id).one(&db).await?;
    assert!(found.is_some());
    let found = found.unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.email, email);

    // Test find by cpf
    let found_by_cpf = usuario::find_by_cpf(&db, created.cpf.as_deref().unwrap()).await?;
    assert_eq!(found_by_cpf.unwrap().id, created.id);

    // Test Delete
    usuario::Entity::delete_by_id(created.id).exec(&db).await?;
    let gone = usuario::Entity::find_by_id(created.id).one(&db).await?;
    assert!(gone.is_none());

    println!("Usuario CRUD test completed successfully");
    Ok(())
}

/// Duplicate unique fields must classify as Conflict, not a generic Db error
#[tokio::test]
async fn test_duplicate_email_is_conflict() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let db = setup_test_db().await?;

    let email = format!("dup_{}@example.com", Uuid::new_v4());
    let first = usuario::create(&db, &sample_usuario(email.clone())).await?;

    let second = usuario::create(&db, &sample_usuario(email)).await;
    match second {
        Err(ModelError::Conflict(_)) => {}
        other => panic!("expected Conflict, got {:?}", other),
    }

    usuario::Entity::delete_by_id(first.id).exec(&db).await?;
    Ok(())
}

/// Cliente rows belong to a Consultor and cascade on delete
#[tokio::test]
async fn test_cliente_cascade_on_consultor_delete() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }

    let db = setup_test_db().await?;

    let mut input = sample_usuario(format!("cons_{}@example.com", Uuid::new_v4()));
    input.tipo = Some(usuario::TIPO_CONSULTOR.to_string());
    let consultor = usuario::create(&db, &input).await?;

    cliente::create(&db, consultor.id, "Acme Ltda").await?;
    cliente::create(&db, consultor.id, "Beta SA").await?;

    let owned = cliente::Entity::find()
        .filter(cliente::Column::ConsultorId.eq(consultor.id))
        .all(&db)
        .await?;
    assert_eq!(owned.len(), 2);

    usuario::Entity::delete_by_id(consultor.id).exec(&db).await?;

    let orphans = cliente::Entity::find()
        .filter(cliente::Column::ConsultorId.eq(consultor.id))
        .all(&db)
        .await?;
    assert!(orphans.is_empty());

    println!("Cliente cascade test completed successfully");
    Ok(())
}
