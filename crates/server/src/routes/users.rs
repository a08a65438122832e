use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use models::usuario;
use service::filters::UserFilter;
use service::user_service::{self, UsuarioChanges, UsuarioComClientes, UsuarioCounts};

use crate::errors::JsonApiError;
use crate::routes::ServerState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    pub nome: Option<String>,
    pub email: Option<String>,
    /// Calendar date as YYYY-MM-DD
    pub data: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CountQuery {
    pub tipo: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ConsultorQuery {
    pub nome: Option<String>,
    pub email: Option<String>,
    /// Calendar date as YYYY-MM-DD
    pub data: Option<String>,
}

/// Client references may arrive as bare names or as `{"nome": ...}` objects
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClienteRef {
    Nome(String),
    Registro { nome: String },
}

impl ClienteRef {
    fn nome(&self) -> &str {
        match self {
            ClienteRef::Nome(n) => n,
            ClienteRef::Registro { nome } => nome,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "idade_lenient")]
    pub idade: Option<i32>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub clientes: Option<Vec<ClienteRef>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "idade_lenient")]
    pub idade: Option<i32>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub clientes: Option<Vec<ClienteRef>>,
}

/// The original frontend sends `idade` either as a number or as a numeric
/// string; coerce both.
fn idade_lenient<'de, D>(de: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }

    match Option::<NumOrStr>::deserialize(de)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => i32::try_from(n).map(Some).map_err(serde::de::Error::custom),
        Some(NumOrStr::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<i32>().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

fn missing(field: &str) -> JsonApiError {
    JsonApiError::new(
        StatusCode::BAD_REQUEST,
        "Validation Error",
        Some(format!("{} is required", field)),
    )
}

fn parse_data(raw: Option<&str>) -> Result<Option<NaiveDate>, JsonApiError> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            JsonApiError::new(
                StatusCode::BAD_REQUEST,
                "Validation Error",
                Some(format!("invalid data '{}' (expected YYYY-MM-DD)", s)),
            )
        }),
    }
}

fn none_if_blank(v: Option<String>) -> Option<String> {
    v.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn to_new_usuario(input: &CreateUserInput) -> Result<usuario::NewUsuario, JsonApiError> {
    let nome = input.nome.clone().ok_or_else(|| missing("nome"))?;
    let email = input.email.clone().ok_or_else(|| missing("email"))?;
    Ok(usuario::NewUsuario {
        nome,
        email,
        telefone: input.telefone.clone(),
        cpf: input.cpf.clone(),
        idade: input.idade,
        endereco: input.endereco.clone(),
        tipo: input.tipo.clone(),
    })
}

fn cliente_nomes(clientes: &Option<Vec<ClienteRef>>) -> Vec<String> {
    clientes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|c| c.nome().to_string())
        .collect()
}

#[utoipa::path(
    post, path = "/users", tag = "users",
    request_body = crate::openapi::CreateUserInputDoc,
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Validation Error"),
        (status = 409, description = "Conflict"),
        (status = 500, description = "Create Failed")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UsuarioComClientes>), JsonApiError> {
    let new_usuario = to_new_usuario(&input)?;
    let clientes = cliente_nomes(&input.clientes);
    match user_service::create_usuario(&state.db, &new_usuario, &clientes).await {
        Ok(created) => {
            info!(id = %created.usuario.id, tipo = %created.usuario.tipo, "created usuario");
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => {
            error!(err = %e, "create usuario failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[utoipa::path(
    post, path = "/users/consultores", tag = "users",
    request_body = crate::openapi::CreateUserInputDoc,
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Validation Error"),
        (status = 409, description = "Conflict"),
        (status = 500, description = "Create Failed")
    )
)]
pub async fn create_consultor(
    State(state): State<ServerState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UsuarioComClientes>), JsonApiError> {
    let new_usuario = to_new_usuario(&input)?;
    let clientes = cliente_nomes(&input.clientes);
    match user_service::create_consultor(&state.db, &new_usuario, &clientes).await {
        Ok(created) => {
            info!(id = %created.usuario.id, clientes = created.clientes.len(), "created consultor");
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => {
            error!(err = %e, "create consultor failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[utoipa::path(
    get, path = "/users", tag = "users",
    params(ListQuery),
    responses(
        (status = 200, description = "List OK"),
        (status = 400, description = "Validation Error"),
        (status = 500, description = "List Failed")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<UsuarioComClientes>>, JsonApiError> {
    let filter = UserFilter {
        nome: none_if_blank(q.nome),
        email: none_if_blank(q.email),
        data: parse_data(q.data.as_deref())?,
    };
    match user_service::list_usuarios(&state.db, &filter).await {
        Ok(list) => {
            info!(count = list.len(), "list usuarios");
            Ok(Json(list))
        }
        Err(e) => Err(JsonApiError::from(e)),
    }
}

#[utoipa::path(
    get, path = "/users/count", tag = "users",
    params(CountQuery),
    responses(
        (status = 200, description = "Counts OK"),
        (status = 400, description = "Validation Error"),
        (status = 500, description = "Count Failed")
    )
)]
pub async fn count(
    State(state): State<ServerState>,
    Query(q): Query<CountQuery>,
) -> Result<Json<UsuarioCounts>, JsonApiError> {
    let tipo = none_if_blank(q.tipo);
    match user_service::count_usuarios(&state.db, tipo.as_deref()).await {
        Ok(counts) => Ok(Json(counts)),
        Err(e) => Err(JsonApiError::from(e)),
    }
}

#[utoipa::path(
    get, path = "/users/clients-by-consultor", tag = "users",
    params(ConsultorQuery),
    responses(
        (status = 200, description = "List OK"),
        (status = 400, description = "Validation Error"),
        (status = 500, description = "List Failed")
    )
)]
pub async fn clients_by_consultor(
    State(state): State<ServerState>,
    Query(q): Query<ConsultorQuery>,
) -> Result<Json<Vec<UsuarioComClientes>>, JsonApiError> {
    let data = parse_data(q.data.as_deref())?;
    let nome = none_if_blank(q.nome);
    let email = none_if_blank(q.email);
    match user_service::list_clientes_by_consultor(
        &state.db,
        nome.as_deref(),
        email.as_deref(),
        data,
    )
    .await
    {
        Ok(list) => {
            info!(count = list.len(), "list clientes by consultor");
            Ok(Json(list))
        }
        Err(e) => Err(JsonApiError::from(e)),
    }
}

#[utoipa::path(
    get, path = "/users/{id}", tag = "users",
    params(("id" = Uuid, Path, description = "Usuario ID")),
    responses(
        (status = 200, description = "OK"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsuarioComClientes>, JsonApiError> {
    match user_service::get_usuario(&state.db, id).await {
        Ok(Some(found)) => Ok(Json(found)),
        Ok(None) => Err(JsonApiError::not_found("usuario")),
        Err(e) => Err(JsonApiError::from(e)),
    }
}

#[utoipa::path(
    get, path = "/users/cpf/{cpf}", tag = "users",
    params(("cpf" = String, Path, description = "National ID")),
    responses(
        (status = 200, description = "OK"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_by_cpf(
    State(state): State<ServerState>,
    Path(cpf): Path<String>,
) -> Result<Json<UsuarioComClientes>, JsonApiError> {
    match user_service::get_usuario_by_cpf(&state.db, &cpf).await {
        Ok(Some(found)) => Ok(Json(found)),
        Ok(None) => Err(JsonApiError::not_found("usuario")),
        Err(e) => Err(JsonApiError::from(e)),
    }
}

fn to_changes(input: &UpdateUserInput) -> UsuarioChanges {
    UsuarioChanges {
        nome: input.nome.clone(),
        email: input.email.clone(),
        telefone: input.telefone.clone(),
        cpf: input.cpf.clone(),
        idade: input.idade,
        endereco: input.endereco.clone(),
        tipo: input.tipo.clone(),
        clientes: input
            .clientes
            .as_ref()
            .map(|refs| refs.iter().map(|c| c.nome().to_string()).collect()),
    }
}

#[utoipa::path(
    put, path = "/users/{id}", tag = "users",
    params(("id" = Uuid, Path, description = "Usuario ID")),
    request_body = crate::openapi::UpdateUserInputDoc,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Conflict"),
        (status = 500, description = "Update Failed")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<UsuarioComClientes>, JsonApiError> {
    match user_service::update_usuario(&state.db, id, &to_changes(&input)).await {
        Ok(updated) => {
            info!(id = %updated.usuario.id, "updated usuario");
            Ok(Json(updated))
        }
        Err(e) => {
            error!(err = %e, %id, "update usuario failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[utoipa::path(
    put, path = "/users/cpf/{cpf}", tag = "users",
    params(("cpf" = String, Path, description = "National ID")),
    request_body = crate::openapi::UpdateUserInputDoc,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Conflict"),
        (status = 500, description = "Update Failed")
    )
)]
pub async fn update_by_cpf(
    State(state): State<ServerState>,
    Path(cpf): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<UsuarioComClientes>, JsonApiError> {
    match user_service::update_usuario_by_cpf(&state.db, &cpf, &to_changes(&input)).await {
        Ok(updated) => {
            info!(id = %updated.usuario.id, "updated usuario by cpf");
            Ok(Json(updated))
        }
        Err(e) => {
            error!(err = %e, %cpf, "update usuario by cpf failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[utoipa::path(
    delete, path = "/users/{id}", tag = "users",
    params(("id" = Uuid, Path, description = "Usuario ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Delete Failed")
    )
)]
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    match user_service::delete_usuario(&state.db, id).await {
        Ok(true) => {
            info!(%id, "deleted usuario");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(JsonApiError::not_found("usuario")),
        Err(e) => {
            error!(err = %e, %id, "delete usuario failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[utoipa::path(
    delete, path = "/users/cpf/{cpf}", tag = "users",
    params(("cpf" = String, Path, description = "National ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Delete Failed")
    )
)]
pub async fn delete_by_cpf(
    State(state): State<ServerState>,
    Path(cpf): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    match user_service::delete_usuario_by_cpf(&state.db, &cpf).await {
        Ok(true) => {
            info!(%cpf, "deleted usuario by cpf");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(JsonApiError::not_found("usuario")),
        Err(e) => {
            error!(err = %e, %cpf, "delete usuario by cpf failed");
            Err(JsonApiError::from(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idade_accepts_numbers_and_numeric_strings() {
        let a: CreateUserInput = serde_json::from_str(r#"{"idade": 31}"#).unwrap();
        assert_eq!(a.idade, Some(31));
        let b: CreateUserInput = serde_json::from_str(r#"{"idade": "31"}"#).unwrap();
        assert_eq!(b.idade, Some(31));
        let c: CreateUserInput = serde_json::from_str(r#"{"idade": ""}"#).unwrap();
        assert_eq!(c.idade, None);
        let d: CreateUserInput = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(d.idade, None);
        assert!(serde_json::from_str::<CreateUserInput>(r#"{"idade": "abc"}"#).is_err());
    }

    #[test]
    fn clientes_accept_names_and_objects() {
        let input: CreateUserInput = serde_json::from_str(
            r#"{"clientes": ["Acme", {"nome": "Beta"}]}"#,
        )
        .unwrap();
        let nomes = cliente_nomes(&input.clientes);
        assert_eq!(nomes, vec!["Acme".to_string(), "Beta".to_string()]);
    }

    #[test]
    fn data_must_be_a_calendar_date() {
        assert_eq!(parse_data(None).unwrap(), None);
        assert_eq!(parse_data(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_data(Some("2024-01-15")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert!(parse_data(Some("15/01/2024")).is_err());
    }

    #[test]
    fn blank_query_values_are_ignored() {
        assert_eq!(none_if_blank(Some("  ".into())), None);
        assert_eq!(none_if_blank(Some(" Ana ".into())), Some("Ana".to_string()));
        assert_eq!(none_if_blank(None), None);
    }
}
