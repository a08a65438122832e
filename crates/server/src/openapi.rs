use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(ToSchema)]
pub struct CreateUserInputDoc {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    /// Number or numeric string
    pub idade: Option<i32>,
    pub endereco: Option<String>,
    pub tipo: Option<String>,
    pub clientes: Option<Vec<String>>,
}

#[derive(ToSchema)]
pub struct UpdateUserInputDoc {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub idade: Option<i32>,
    pub endereco: Option<String>,
    pub tipo: Option<String>,
    /// Replaces the whole association set when present
    pub clientes: Option<Vec<String>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::users::create,
        crate::routes::users::create_consultor,
        crate::routes::users::list,
        crate::routes::users::count,
        crate::routes::users::clients_by_consultor,
        crate::routes::users::get,
        crate::routes::users::get_by_cpf,
        crate::routes::users::update,
        crate::routes::users::update_by_cpf,
        crate::routes::users::delete,
        crate::routes::users::delete_by_cpf,
    ),
    components(
        schemas(
            HealthResponse,
            CreateUserInputDoc,
            UpdateUserInputDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "users")
    )
)]
pub struct ApiDoc;
