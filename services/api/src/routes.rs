//! API service routes
//!
//! Routes are grouped by role allow-list. Each group carries its own
//! authentication layer; the groups are then merged under the API base path.

use std::time::Duration;

use auth::models::{
    BulkUpdateRequest, CreateStaffRequest, ListUsersParams, LoginRequest, RegisterRequest, Role,
    UpdatePasswordRequest, UpdateProfileRequest, UpdateRoleRequest, UpdateStatusRequest,
    UserQuery,
};
use auth::repositories::UserRepository;
use auth::service::{STAFF_INSTRUCTIONS, parse_user_id};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use axum_extra::extract::WithRejection;
use chrono::{SecondsFormat, Utc};
use media::{Location, MAX_FILES_PER_UPLOAD, Storage, StorageError, UploadedFile, mime};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    error::{ApiError, ApiResult},
    middleware::{CurrentUser, authenticate, rate_limit},
    state::AppState,
};

/// User administration
pub const USER_ADMINS: &[Role] = &[Role::Admin, Role::Superadmin];
/// Staff account provisioning
pub const STAFF_PROVISIONERS: &[Role] = &[Role::Manager, Role::Admin, Role::Superadmin];
/// Any signed-in account
pub const ALL_ROLES: &[Role] = &Role::ALL;
/// Anyone, signed in or not
pub const PUBLIC: &[Role] = &[];

/// JSON body whose decode failures use the API error envelope
type JsonBody<T> = WithRejection<Json<T>, ApiError>;

fn success(message: impl Into<String>) -> Value {
    json!({ "success": true, "message": message.into() })
}

fn with_data(message: impl Into<String>, data: Value) -> Json<Value> {
    let mut body = success(message);
    body["data"] = data;
    Json(body)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400))
}

/// Create the router for the API service
pub fn create_router<R: UserRepository>(state: AppState<R>) -> Router {
    let guard = |allowed: &'static [Role]| {
        middleware::from_fn_with_state((state.clone(), allowed), authenticate::<R>)
    };
    let upload_limit = state.storage.max_upload_bytes() * MAX_FILES_PER_UPLOAD + 1024 * 1024;

    let accounts = Router::new()
        .route("/user/login", post(login::<R>))
        .route("/user/register", post(register::<R>));

    let staff = Router::new()
        .route("/user/staff", post(create_staff::<R>))
        .route_layer(guard(STAFF_PROVISIONERS));

    let admin = Router::new()
        .route("/user", get(list_users::<R>))
        .route("/user/bulk/update", patch(bulk_update::<R>))
        .route("/user/:id", get(get_user::<R>).delete(delete_user::<R>))
        .route("/user/:id/status", patch(update_status::<R>))
        .route("/user/:id/role", patch(update_role::<R>))
        .route_layer(guard(USER_ADMINS));

    let signed_in = Router::new()
        .route("/profile", get(get_profile::<R>).patch(update_profile::<R>))
        .route("/profile/password", patch(update_password::<R>))
        .route(
            "/profile/image",
            patch(upload_profile_image::<R>).delete(remove_profile_image::<R>),
        )
        .route("/file/single", post(upload_single::<R>))
        .route("/file/multi", post(upload_multi::<R>))
        .layer(DefaultBodyLimit::max(upload_limit))
        .route_layer(guard(ALL_ROLES));

    let files = Router::new()
        .route("/file/:filename", get(serve_file::<R>))
        .route_layer(guard(PUBLIC));

    let api = accounts
        .merge(staff)
        .merge(admin)
        .merge(signed_in)
        .merge(files);

    let base = state.config.api_base_url.trim_end_matches('/');
    let root = Router::new()
        .route("/", get(banner))
        .route("/health", get(health::<R>));
    let root = if base.is_empty() {
        root.merge(api)
    } else {
        root.nest(base, api)
    };

    root.layer(middleware::from_fn_with_state(state.clone(), rate_limit::<R>))
        .layer(cors_layer(&state.config.cors_origins()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn banner() -> &'static str {
    "Bikaner Elite Backend is running"
}

/// Health check endpoint
async fn health<R: UserRepository>(State(state): State<AppState<R>>) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let failure = match state.accounts.users().health_check().await {
        Ok(true) => {
            return Json(json!({
                "status": "healthy",
                "dbStatus": "connected",
                "timestamp": timestamp,
            }))
            .into_response();
        }
        Ok(false) => "Database did not answer".to_string(),
        Err(e) => e.to_string(),
    };

    error!("Health check failed: {}", failure);
    let mut body = json!({
        "status": "unhealthy",
        "dbStatus": "disconnected",
        "timestamp": timestamp,
    });
    if !state.config.is_production() {
        body["message"] = json!(failure);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn login<R: UserRepository>(
    State(state): State<AppState<R>>,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let session = state.accounts.login(request).await?;

    let mut body = success("Login successful");
    body["token"] = json!(session.token);
    body["user"] = json!(session.user);
    Ok(Json(body))
}

async fn register<R: UserRepository>(
    State(state): State<AppState<R>>,
    WithRejection(Json(request), _): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.accounts.register(request).await?;

    let mut body = success("User registered successfully");
    body["token"] = json!(session.token);
    body["user"] = json!(session.user);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn create_staff<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    WithRejection(Json(request), _): JsonBody<CreateStaffRequest>,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.create_staff(request).await?;
    info!(
        "{} {} provisioned account {}",
        caller.role, caller.user_id, account.user.id
    );

    Ok((
        StatusCode::CREATED,
        with_data(
            "Staff account created successfully",
            json!({
                "user": account.user,
                "temporaryPassword": account.temporary_password,
                "instructions": STAFF_INSTRUCTIONS,
            }),
        ),
    ))
}

async fn list_users<R: UserRepository>(
    State(state): State<AppState<R>>,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<Value>> {
    let page = state.accounts.list_users(&UserQuery::from(params)).await?;

    let mut body = success("Users fetched successfully");
    body["data"] = json!(page.items);
    body["pagination"] = json!(page.pagination);
    Ok(Json(body))
}

async fn get_user<R: UserRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = state.accounts.get_user(parse_user_id(&id)?).await?;
    Ok(with_data("User fetched successfully", json!(user)))
}

async fn update_status<R: UserRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    WithRejection(Json(request), _): JsonBody<UpdateStatusRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .accounts
        .update_status(parse_user_id(&id)?, request.status)
        .await?;
    Ok(with_data(
        format!("User status updated to {}", user.status),
        json!(user),
    ))
}

async fn update_role<R: UserRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    WithRejection(Json(request), _): JsonBody<UpdateRoleRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .accounts
        .update_role(parse_user_id(&id)?, request.role)
        .await?;
    Ok(with_data(
        format!("User role updated to {}", user.role),
        json!(user),
    ))
}

async fn bulk_update<R: UserRepository>(
    State(state): State<AppState<R>>,
    WithRejection(Json(request), _): JsonBody<BulkUpdateRequest>,
) -> ApiResult<Json<Value>> {
    let modified = state.accounts.bulk_update(request).await?;
    Ok(with_data(
        format!("{} users updated successfully", modified),
        json!({ "modifiedCount": modified }),
    ))
}

async fn delete_user<R: UserRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_user_id(&id)?;
    state.accounts.delete_user(user_id).await?;
    Ok(with_data(
        "User deleted successfully",
        json!({ "userId": user_id }),
    ))
}

async fn get_profile<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    let user = state.accounts.profile(caller.user_id).await?;
    Ok(with_data("Profile fetched successfully", json!(user)))
}

async fn update_profile<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    WithRejection(Json(request), _): JsonBody<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .accounts
        .update_profile(caller.user_id, request)
        .await?;
    Ok(with_data("Profile updated successfully", json!(user)))
}

async fn update_password<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    WithRejection(Json(request), _): JsonBody<UpdatePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .accounts
        .update_password(caller.user_id, request)
        .await?;
    Ok(Json(success("Password updated successfully")))
}

/// Read up to `max_files` uploads from the named multipart field
async fn collect_files(
    storage: &Storage,
    mut multipart: Multipart,
    field_name: &str,
    max_files: usize,
) -> ApiResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    let limit = storage.max_upload_bytes();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        if files.len() == max_files {
            return Err(ApiError::BadRequest("Too many files".to_string()));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        // Type first, so rejected uploads are never buffered
        storage.validate(&content_type, 0)?;

        // Stop reading as soon as the part crosses the size limit
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(StorageError::TooLarge { limit }.into());
            }
            bytes.extend_from_slice(&chunk);
        }

        files.push(UploadedFile {
            original_name,
            content_type,
            bytes,
        });
    }

    Ok(files)
}

async fn upload_profile_image<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    multipart: Option<Multipart>,
) -> ApiResult<Json<Value>> {
    let upload = match multipart {
        Some(multipart) => collect_files(&state.storage, multipart, "file", 1)
            .await?
            .pop(),
        None => None,
    };

    let user = match upload {
        Some(file) => {
            let stored = state.storage.store(file).await?;
            state
                .accounts
                .set_profile_image(caller.user_id, Some(stored.path))
                .await?
        }
        None => state.accounts.assign_avatar(caller.user_id).await?,
    };

    Ok(with_data("Profile image updated successfully", json!(user)))
}

async fn remove_profile_image<R: UserRepository>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Value>> {
    let user = state
        .accounts
        .set_profile_image(caller.user_id, None)
        .await?;
    Ok(with_data("Profile image removed successfully", json!(user)))
}

async fn upload_single<R: UserRepository>(
    State(state): State<AppState<R>>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<Json<Value>> {
    let Some(file) = collect_files(&state.storage, multipart, "file", 1)
        .await?
        .pop()
    else {
        return Err(ApiError::BadRequest("No file was uploaded".to_string()));
    };

    let stored = state.storage.store(file).await?;

    let mut body = success("File uploaded successfully");
    body["file"] = json!(stored);
    Ok(Json(body))
}

async fn upload_multi<R: UserRepository>(
    State(state): State<AppState<R>>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<Json<Value>> {
    let files = collect_files(&state.storage, multipart, "files", MAX_FILES_PER_UPLOAD).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files were uploaded".to_string()));
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        stored.push(state.storage.store(file).await?);
    }

    let mut body = success("Files uploaded successfully");
    body["files"] = json!(stored);
    Ok(Json(body))
}

/// Serve a local upload, or redirect to its object URL
async fn serve_file<R: UserRepository>(
    State(state): State<AppState<R>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    match state.storage.locate(&filename).await? {
        Location::Local(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ApiError::internal("File download failed", e))?;
            let content_type =
                mime::content_type_for(&filename).unwrap_or("application/octet-stream");
            Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        Location::Remote(url) => Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response()),
    }
}
