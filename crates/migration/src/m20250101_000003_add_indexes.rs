use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Usuario: listing and the 7-day count both sort/filter on criado_em
        manager
            .create_index(
                Index::create()
                    .name("idx_usuario_criado_em")
                    .table(Usuario::Table)
                    .col(Usuario::CriadoEm)
                    .to_owned(),
            )
            .await?;

        // Usuario: count endpoint can be scoped by tipo
        manager
            .create_index(
                Index::create()
                    .name("idx_usuario_tipo")
                    .table(Usuario::Table)
                    .col(Usuario::Tipo)
                    .to_owned(),
            )
            .await?;

        // Cliente: lookups and replace-on-update go through consultor_id
        manager
            .create_index(
                Index::create()
                    .name("idx_cliente_consultor")
                    .table(Cliente::Table)
                    .col(Cliente::ConsultorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_usuario_criado_em").table(Usuario::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_usuario_tipo").table(Usuario::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_cliente_consultor").table(Cliente::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Usuario { Table, CriadoEm, Tipo }

#[derive(DeriveIden)]
enum Cliente { Table, ConsultorId }
