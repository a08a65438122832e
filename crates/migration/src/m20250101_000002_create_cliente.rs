//! Create `cliente` table with FK to `usuario`.
//!
//! Rows are owned by a Consultor; deleting the Consultor cascades.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cliente::Table)
                    .if_not_exists()
                    .col(uuid(Cliente::Id).primary_key())
                    .col(uuid(Cliente::ConsultorId).not_null())
                    .col(string_len(Cliente::Nome, 128).not_null())
                    .col(timestamp_with_time_zone(Cliente::CriadoEm).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cliente_consultor")
                            .from(Cliente::Table, Cliente::ConsultorId)
                            .to(Usuario::Table, Usuario::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Cliente::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Cliente { Table, Id, ConsultorId, Nome, CriadoEm }

#[derive(DeriveIden)]
enum Usuario { Table, Id }
