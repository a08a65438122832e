//! Create `usuario` table.
//!
//! Email, telefone and cpf carry unique constraints; NULL telefone/cpf
//! values do not collide with each other.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Usuario::Table)
                    .if_not_exists()
                    .col(uuid(Usuario::Id).primary_key())
                    .col(string_len(Usuario::Nome, 128).not_null())
                    .col(string_len(Usuario::Email, 255).unique_key().not_null())
                    .col(
                        ColumnDef::new(Usuario::Telefone)
                            .string_len(32)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Usuario::Cpf)
                            .string_len(14)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Usuario::Idade).integer().null())
                    .col(ColumnDef::new(Usuario::Endereco).string_len(255).null())
                    .col(string_len(Usuario::Tipo, 16).not_null())
                    .col(timestamp_with_time_zone(Usuario::CriadoEm).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Usuario::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Usuario { Table, Id, Nome, Email, Telefone, Cpf, Idade, Endereco, Tipo, CriadoEm }
