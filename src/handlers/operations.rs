// src/handlers/operations.rs

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    common::{
        blob_store::BlobCategory,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
    },
    models::operation::{
        ComponentKind, ComponentRef, DeletedFiles, InstructionUploads, NewOperation, Operation,
        OperationDetail, OperationLinks, OperationUpdate, UploadedFile,
    },
};

// ---
// Formulário multipart da operação (criação e edição)
// ---

/// Tudo o que o formulário da operação pode trazer, ainda sem validação de negócio.
#[derive(Debug, Default)]
pub(crate) struct OperationForm {
    pub name: String,
    pub component: Option<ComponentRef>,
    pub component_type: Option<ComponentKind>,
    pub component_id: Option<i64>,
    pub links: OperationLinks,
    pub files: InstructionUploads,
    pub deleted_files: DeletedFiles,
}

impl OperationForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = OperationForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(category) = BlobCategory::instruction_from_str(&name) {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let upload = UploadedFile { file_name, bytes: bytes.to_vec() };
                match category {
                    BlobCategory::Photos => form.files.photos.push(upload),
                    BlobCategory::Videos => form.files.videos.push(upload),
                    _ => form.files.texts.push(upload),
                }
                continue;
            }

            let value = field.text().await?;
            form.apply_text(&name, value.trim())?;
        }

        Ok(form)
    }

    fn apply_text(&mut self, field: &str, value: &str) -> Result<(), AppError> {
        match field {
            "name" => self.name = value.to_string(),
            "component" => self.component = non_empty(value).map(parse_ref).transpose()?,
            "componentType" => {
                self.component_type = non_empty(value)
                    .map(|v| v.parse().map_err(AppError::InvalidInput))
                    .transpose()?
            }
            "componentId" => self.component_id = non_empty(value).map(|v| parse_id(field, v)).transpose()?,
            "locationId" => self.links.location_id = non_empty(value).map(|v| parse_id(field, v)).transpose()?,
            "toolIds" | "toolIds[]" => self.links.tool_ids.extend(parse_id_list(field, value)?),
            "materialIds" | "materialIds[]" => self.links.material_ids.extend(parse_id_list(field, value)?),
            "dependencies" | "dependencies[]" => {
                for raw in split_list(value) {
                    self.links.dependencies.push(parse_ref(raw)?);
                }
            }
            "deletedFiles" => {
                if let Some(raw) = non_empty(value) {
                    self.deleted_files = serde_json::from_str(raw)
                        .map_err(|e| AppError::InvalidInput(format!("deletedFiles: {e}")))?;
                }
            }
            other => tracing::debug!(field = other, "Campo desconhecido ignorado"),
        }
        Ok(())
    }

    /// `component` tem precedência sobre o par `componentType`/`componentId`.
    fn target_component(&self) -> Result<ComponentRef, AppError> {
        if let Some(component) = self.component {
            return Ok(component);
        }
        match (self.component_type, self.component_id) {
            (Some(kind), Some(id)) => Ok(ComponentRef::new(kind, id)),
            (None, _) => Err(AppError::MissingParameter("componentType")),
            (_, None) => Err(AppError::MissingParameter("componentId")),
        }
    }

    pub(crate) fn into_new(self) -> Result<NewOperation, AppError> {
        let component = self.target_component()?;
        Ok(NewOperation {
            name: self.name,
            component,
            links: self.links,
            files: self.files,
        })
    }

    pub(crate) fn into_update(self) -> OperationUpdate {
        OperationUpdate {
            name: self.name,
            links: self.links,
            files: self.files,
            deleted_files: self.deleted_files,
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(field: &str, value: &str) -> Result<i64, AppError> {
    value
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("{field}: '{value}' não é um id")))
}

fn parse_id_list(field: &str, value: &str) -> Result<Vec<i64>, AppError> {
    split_list(value).map(|v| parse_id(field, v)).collect()
}

fn parse_ref(value: &str) -> Result<ComponentRef, AppError> {
    value.parse().map_err(AppError::InvalidInput)
}

/// Corpo binário com o content-type deduzido da extensão.
pub(crate) fn file_response(file_name: &str, bytes: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], bytes).into_response()
}

pub(crate) fn parse_category(raw: &str) -> Result<BlobCategory, AppError> {
    BlobCategory::instruction_from_str(raw)
        .ok_or_else(|| AppError::InvalidInput(format!("categoria desconhecida '{raw}'")))
}

// ---
// Handlers
// ---

// POST /api/admin/operations
#[utoipa::path(
    post,
    path = "/api/admin/operations",
    tag = "Operations",
    request_body(
        content_type = "multipart/form-data",
        description = "name, component (tipo:id) ou componentType+componentId, locationId?, toolIds, materialIds, dependencies, arquivos photo/video/text"
    ),
    responses(
        (status = 201, description = "Operação criada com instrução", body = Operation),
        (status = 400, description = "Campos ou vínculos inválidos"),
        (status = 404, description = "Componente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_operation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let input = OperationForm::read(multipart)
        .await
        .and_then(OperationForm::into_new)
        .map_err(to_api)?;

    let operation = app_state
        .operation_service
        .create(&session, input)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(operation)))
}

// GET /api/admin/operations/{operation_id}
#[utoipa::path(
    get,
    path = "/api/admin/operations/{operation_id}",
    tag = "Operations",
    params(("operation_id" = i64, Path, description = "ID da operação")),
    responses(
        (status = 200, description = "Operação com vínculos e arquivos", body = OperationDetail),
        (status = 404, description = "Operação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn operation_detail(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(operation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .operation_service
        .detail(&session, operation_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// PUT /api/admin/operations/{operation_id}
#[utoipa::path(
    put,
    path = "/api/admin/operations/{operation_id}",
    tag = "Operations",
    params(("operation_id" = i64, Path, description = "ID da operação")),
    request_body(
        content_type = "multipart/form-data",
        description = "name, locationId?, toolIds, materialIds, dependencies, deletedFiles (JSON), arquivos photo/video/text"
    ),
    responses(
        (status = 200, description = "Operação atualizada", body = Operation),
        (status = 400, description = "Campos ou vínculos inválidos"),
        (status = 404, description = "Operação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_operation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(operation_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let input = OperationForm::read(multipart).await.map_err(to_api)?.into_update();
    let operation = app_state
        .operation_service
        .update(&session, operation_id, input)
        .await
        .map_err(to_api)?;

    Ok(Json(operation))
}

// DELETE /api/admin/operations/{operation_id}
#[utoipa::path(
    delete,
    path = "/api/admin/operations/{operation_id}",
    tag = "Operations",
    params(("operation_id" = i64, Path, description = "ID da operação")),
    responses(
        (status = 204, description = "Operação, vínculos e instrução removidos"),
        (status = 404, description = "Operação não encontrada"),
        (status = 409, description = "Operação ainda referenciada por tarefas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_operation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(operation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .operation_service
        .delete(&session, operation_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/operations/{operation_id}/files/{category}/{file_name}
#[utoipa::path(
    get,
    path = "/api/admin/operations/{operation_id}/files/{category}/{file_name}",
    tag = "Operations",
    params(
        ("operation_id" = i64, Path, description = "ID da operação"),
        ("category" = String, Path, description = "photo | video | text"),
        ("file_name" = String, Path, description = "Nome do arquivo")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo", content_type = "application/octet-stream"),
        (status = 404, description = "Arquivo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn instruction_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path((operation_id, category, file_name)): Path<(i64, String, String)>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let category = parse_category(&category).map_err(to_api)?;
    let bytes = app_state
        .operation_service
        .read_instruction_file(&session, operation_id, category, &file_name)
        .await
        .map_err(to_api)?;

    Ok(file_response(&file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    fn form(fields: &[(&str, &str)]) -> OperationForm {
        let mut form = OperationForm::default();
        for (name, value) in fields {
            form.apply_text(name, value).unwrap();
        }
        form
    }

    #[test]
    fn lists_accept_repeated_and_comma_separated_values() {
        let form = form(&[
            ("toolIds", "1, 2"),
            ("toolIds", "3"),
            ("materialIds[]", ""),
            ("dependencies", "block:4,detail:5"),
            ("locationId", ""),
        ]);
        assert_eq!(form.links.tool_ids, vec![1, 2, 3]);
        assert!(form.links.material_ids.is_empty());
        assert_eq!(
            form.links.dependencies,
            vec![ComponentRef::Block(4), ComponentRef::Detail(5)]
        );
        assert_eq!(form.links.location_id, None);
    }

    #[test]
    fn component_prefers_the_combined_field() {
        let both = form(&[("componentType", "block"), ("componentId", "7"), ("component", "detail:9")]);
        assert_eq!(both.target_component().unwrap(), ComponentRef::Detail(9));

        let pair = form(&[("componentType", "block"), ("componentId", "7")]);
        assert_eq!(pair.target_component().unwrap(), ComponentRef::Block(7));

        let missing = form(&[("componentType", "block")]);
        assert!(matches!(
            missing.target_component(),
            Err(AppError::MissingParameter("componentId"))
        ));
    }

    #[test]
    fn bad_ids_and_deleted_files_are_invalid_input() {
        let mut form = OperationForm::default();
        assert!(matches!(form.apply_text("toolIds", "1,x"), Err(AppError::InvalidInput(_))));
        assert!(matches!(form.apply_text("deletedFiles", "{"), Err(AppError::InvalidInput(_))));

        form.apply_text("deletedFiles", r#"{"photo":["a.jpg"]}"#).unwrap();
        assert_eq!(form.deleted_files.photo, vec!["a.jpg".to_string()]);
        assert!(form.deleted_files.video.is_empty());
    }

    #[test]
    fn file_response_guesses_content_type() {
        let response = file_response("foto.png", vec![1, 2, 3]);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let response = file_response("sem_extensao", vec![]);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
    }

    #[tokio::test]
    async fn reads_text_and_file_parts() {
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nSoldagem\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"component\"\r\n\r\ndetail:3\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"a.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();

        let input = OperationForm::read(multipart).await.unwrap().into_new().unwrap();
        assert_eq!(input.name, "Soldagem");
        assert_eq!(input.component, ComponentRef::Detail(3));
        assert_eq!(input.files.photos.len(), 1);
        assert_eq!(input.files.photos[0].file_name, "a.jpg");
        assert_eq!(input.files.photos[0].bytes, b"JPEGDATA");
    }
}
