//! Client API handlers.
//!
//! Every handler except login, logout, and status requires a session cookie.
//! Requests then pass path resolution before the policy gate, so a traversal
//! attempt never consumes an approval token.

use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use protocol::messages::{
    ClientStatus, DirectoryListing, DownloadQuery, DownloadRequestBody, DownloadTicketResponse,
    ListQuery, LoginRequest, PreviewQuery, RequestCheck,
};
use protocol::{RequestId, RequestStatus};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::{ApiResult, AppState};
use crate::error::AccessError;
use crate::files::{
    normalize_relative, read_text_preview, PreviewError, PreviewKind, MAX_TEXT_PREVIEW_SIZE,
};
use crate::policy::DownloadTicket;
use crate::session::{AuthOutcome, SessionGuard, SessionToken, SESSION_COOKIE};

fn session_token(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| SessionToken::from_cookie(cookie.value()))
}

fn require_session(state: &AppState, jar: &CookieJar) -> ApiResult<()> {
    let token = session_token(jar).ok_or(AccessError::Unauthenticated)?;
    let settings = state.share.read()?;
    state.sessions.authorize(&token, &settings).into_result()?;
    Ok(())
}

/// Resolve `relative` and require a regular file there.
fn resolve_file(state: &AppState, relative: &str) -> ApiResult<PathBuf> {
    let resolved = state.share.resolver()?.resolve(relative)?;
    if !resolved.is_file() {
        return Err(AccessError::NotFound(relative.to_string()).into());
    }
    Ok(resolved)
}

fn download_link(path: &str, token: Option<RequestId>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("path", path);
    if let Some(token) = token {
        query.append_pair("token", &token.to_string());
    }
    format!("/api/download?{}", query.finish())
}

fn file_name(path: &FsPath) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `Content-Disposition` value with an ASCII fallback name and the exact
/// UTF-8 name as an RFC 5987 `filename*` parameter.
fn disposition(kind: &str, path: &FsPath) -> String {
    let name = file_name(path);
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        return format!("{kind}; filename=\"download\"");
    }
    if fallback == name {
        return format!("{kind}; filename=\"{name}\"");
    }
    format!(
        "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(&name)
    )
}

fn stream_file(file: File, size: u64, content_type: &str, disposition: String) -> ApiResult<Response> {
    let content_type =
        HeaderValue::from_str(content_type).map_err(|e| AccessError::Internal(e.to_string()))?;
    let disposition =
        HeaderValue::from_str(&disposition).map_err(|e| AccessError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(CookieJar, StatusCode)> {
    let session = {
        let settings = state.share.read()?;
        SessionGuard::login(&body.password, &settings)?
    };

    if let Some(previous) = session_token(&jar) {
        state.sessions.remove(&previous);
    }
    let token = state.sessions.insert(session);
    tracing::info!(active = state.sessions.len(), "Client logged in");

    let cookie = Cookie::build((SESSION_COOKIE, token.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}

/// `POST /api/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(token) = session_token(&jar) {
        state.sessions.remove(&token);
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/").build()),
        StatusCode::NO_CONTENT,
    )
}

/// `GET /api/status`
///
/// Reports `force_logout` once for a revoked session, then forgets it.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<ClientStatus>> {
    let settings = state.share.settings()?;
    let force_logout = session_token(&jar)
        .map(|token| state.sessions.authorize(&token, &settings) == AuthOutcome::ForcedLogout)
        .unwrap_or(false);

    Ok(Json(ClientStatus {
        paused: settings.is_paused,
        running: settings.is_running,
        force_logout,
        config_id: settings.config_version,
        previews: settings.enable_previews,
    }))
}

/// `GET /api/files?path=`
pub async fn list_files(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<DirectoryListing>> {
    require_session(&state, &jar)?;
    state.policy.authorize_list()?;

    let resolver = state.share.resolver()?;
    let browser = state.browser.clone();
    let listing =
        tokio::task::spawn_blocking(move || browser.list(&resolver, &query.path)).await??;

    Ok(Json(listing))
}

/// `POST /api/requests`
pub async fn request_download(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<DownloadRequestBody>,
) -> ApiResult<Json<DownloadTicketResponse>> {
    require_session(&state, &jar)?;
    resolve_file(&state, &body.path)?;

    let response = match state.policy.request_download(&body.path)? {
        DownloadTicket::Direct => DownloadTicketResponse::Approved {
            direct_link: download_link(&normalize_relative(&body.path)?, None),
        },
        DownloadTicket::Pending(req_id) => DownloadTicketResponse::Pending { req_id },
    };
    Ok(Json(response))
}

/// `GET /api/requests/{id}`
pub async fn check_request(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<RequestCheck>> {
    require_session(&state, &jar)?;

    let id: RequestId = raw_id
        .parse()
        .map_err(|_| AccessError::NotFound(format!("request {raw_id}")))?;
    let request = state.approvals.peek(&id)?;

    let link = (request.status == RequestStatus::Approved)
        .then(|| download_link(&request.file_path, Some(id)));

    Ok(Json(RequestCheck {
        status: request.status,
        link,
    }))
}

/// `GET /api/download?path=&token=`
pub async fn download(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    require_session(&state, &jar)?;
    let resolved = resolve_file(&state, &query.path)?;

    // Open first so a failed open never spends a one-time token.
    let file = File::open(&resolved).await?;
    let size = file.metadata().await?.len();

    // An unparsable token is treated like a missing one.
    let token = query
        .token
        .as_deref()
        .and_then(|t| t.parse::<RequestId>().ok());
    let grant = state.policy.authorize_download(&query.path, token)?;
    tracing::info!(file = %query.path, size, grant = ?grant, "Serving download");

    stream_file(
        file,
        size,
        "application/octet-stream",
        disposition("attachment", &resolved),
    )
}

/// `GET /api/preview?path=`
pub async fn preview(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Response> {
    require_session(&state, &jar)?;
    let resolved = resolve_file(&state, &query.path)?;
    state.policy.authorize_preview(&query.path)?;

    let name = file_name(&resolved);
    let kind = PreviewKind::from_name(&name).ok_or_else(|| PreviewError::Unsupported(name.clone()))?;
    let content_type = kind.content_type(&name).to_string();

    if kind == PreviewKind::Text {
        let size = tokio::fs::metadata(&resolved).await?.len();
        state.policy.check_text_preview_size(size)?;
        let text =
            tokio::task::spawn_blocking(move || read_text_preview(&resolved, MAX_TEXT_PREVIEW_SIZE))
                .await??;
        return Ok(([(header::CONTENT_TYPE, content_type)], text).into_response());
    }

    let file = File::open(&resolved).await?;
    let size = file.metadata().await?.len();
    stream_file(file, size, &content_type, disposition("inline", &resolved))
}
