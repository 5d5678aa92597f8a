use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;

use super::extract::{redirect_with_flash, redirect_with_session, CurrentUser, SessionId};
use super::views::{self, DashboardView, DetailView, ErrorView, LoginView};
use super::{AppError, AppState};
use crate::auth::AuthError;
use crate::pipeline::DetailOutcome;
use crate::session::{Flash, FlashLevel};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<String>,
    per_page: Option<String>,
}

pub async fn index() -> Redirect {
    Redirect::to("/login")
}

pub async fn login_page(State(state): State<AppState>, session: SessionId) -> Response {
    if let Some(id) = session.as_deref() {
        if state.sessions.identity(id).is_some() {
            return Redirect::to("/dashboard").into_response();
        }
    }

    login_view(&state, &session, None).await
}

pub async fn login_submit(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(id) = session.as_deref() {
        if state.sessions.identity(id).is_some() {
            return Ok(Redirect::to("/dashboard").into_response());
        }
    }

    let username = form.username.trim().to_string();
    let password = form.password.trim().to_string();
    let auth = state.auth.clone();

    let result = tokio::task::spawn_blocking(move || auth.verify_credentials(&username, &password))
        .await
        .map_err(|e| AppError::new(state.messages.server_error, e))?;

    let notice = match result {
        Ok(identity) => {
            log::info!("{} logged in", identity.display_name());
            let id = state.sessions.login(session.as_deref(), identity);
            state.sessions.push_flash(
                Some(&id),
                Flash::new(FlashLevel::Success, state.messages.welcome),
            );
            return Ok(redirect_with_session(&id, "/dashboard"));
        }
        Err(AuthError::InvalidInput(e)) => {
            log::debug!("Rejected login form: {e}");
            state.messages.invalid_data
        }
        Err(AuthError::BadCredentials | AuthError::NotAuthorized(_)) => {
            state.messages.bad_credentials
        }
        Err(AuthError::Store(e)) => return Err(AppError::new(state.messages.server_error, e)),
    };

    Ok(login_view(&state, &session, Some(Flash::new(FlashLevel::Error, notice))).await)
}

pub async fn login_sso(
    State(state): State<AppState>,
    session: SessionId,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(header_name) = state.sso_header.clone() else {
        return Ok(not_found_view(&state, &session).await);
    };

    let email = headers
        .get(&header_name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let auth = state.auth.clone();

    let result = tokio::task::spawn_blocking(move || auth.authorize_email(&email))
        .await
        .map_err(|e| AppError::new(state.messages.server_error, e))?;

    match result {
        Ok(identity) => {
            log::info!("{} logged in through single sign-on", identity.display_name());
            let welcome = state.messages.welcome_email(identity.display_name());
            let id = state.sessions.login(session.as_deref(), identity);
            state
                .sessions
                .push_flash(Some(&id), Flash::new(FlashLevel::Success, welcome));
            Ok(redirect_with_session(&id, "/dashboard"))
        }
        Err(AuthError::Store(e)) => Err(AppError::new(state.messages.server_error, e)),
        Err(e) => {
            log::warn!("Single sign-on refused: {e}");
            let flash = Flash::new(FlashLevel::Error, state.messages.not_authorized);
            Ok(redirect_with_flash(&state, session.as_deref(), flash, "/login"))
        }
    }
}

pub async fn logout(State(state): State<AppState>, session: SessionId) -> Response {
    if let Some(id) = session.as_deref() {
        state.sessions.destroy(id);
    }

    let flash = Flash::new(FlashLevel::Info, state.messages.logged_out);
    redirect_with_flash(&state, None, flash, "/login")
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Response {
    let dashboard = state
        .pipeline
        .dashboard(params.page.as_deref(), params.per_page.as_deref())
        .await;

    if dashboard.degraded {
        state.sessions.push_flash(
            Some(&user.session),
            Flash::new(FlashLevel::Error, state.messages.load_error),
        );
    }

    Json(DashboardView {
        page: dashboard.page,
        logos: views::logos(&state.static_dir).await,
        username: user.identity.display_name().to_string(),
        flashes: state.sessions.take_flashes(&user.session),
    })
    .into_response()
}

pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let notice = match state.pipeline.detail(&id).await {
        DetailOutcome::Found(item) => {
            return Json(DetailView {
                item,
                logos: views::logos(&state.static_dir).await,
                username: user.identity.display_name().to_string(),
                flashes: state.sessions.take_flashes(&user.session),
            })
            .into_response();
        }
        DetailOutcome::InvalidId => state.messages.invalid_id,
        DetailOutcome::NotFound => state.messages.not_found,
        DetailOutcome::Failed => state.messages.detail_error,
    };

    let flash = Flash::new(FlashLevel::Error, notice);
    redirect_with_flash(&state, Some(&user.session), flash, "/dashboard")
}

pub async fn not_found(State(state): State<AppState>, session: SessionId) -> Response {
    not_found_view(&state, &session).await
}

async fn not_found_view(state: &AppState, session: &SessionId) -> Response {
    let view = ErrorView {
        status: StatusCode::NOT_FOUND.as_u16(),
        flashes: take_flashes(state, session),
        logos: views::logos(&state.static_dir).await,
    };

    (StatusCode::NOT_FOUND, Json(view)).into_response()
}

async fn login_view(state: &AppState, session: &SessionId, notice: Option<Flash>) -> Response {
    let mut flashes = take_flashes(state, session);
    flashes.extend(notice);

    Json(LoginView {
        flashes,
        images: views::property_images(&state.static_dir).await,
    })
    .into_response()
}

fn take_flashes(state: &AppState, session: &SessionId) -> Vec<Flash> {
    session
        .as_deref()
        .map(|id| state.sessions.take_flashes(id))
        .unwrap_or_default()
}
