//! Login, logout and password change pages

use super::{Account, AuthError, MIN_PASSWORD_LENGTH};
use crate::{
    middleware::SessionScope,
    templates::{render, ChangePasswordTemplate, Layout, LoginTemplate},
    AppState, WebError, WebResult,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use schooldesk_core::Role;
use schooldesk_session::{LoginIdentity, SessionLifecycleManager};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Reason shown on the login page after signing out
pub const LOGGED_OUT_MESSAGE: &str = "You have been logged out.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Where a freshly signed-in user goes
fn landing_page(manager: &SessionLifecycleManager) -> String {
    if manager.must_change_password() {
        manager.policy().change_password_path().to_string()
    } else {
        manager.dashboard_url()
    }
}

/// Login page; signed-in users are sent on to their landing page
pub async fn login_page(
    Query(query): Query<LoginQuery>,
    scope: SessionScope,
) -> WebResult<Response> {
    if scope.manager.is_logged_in() {
        return Ok(Redirect::to(&landing_page(&scope.manager)).into_response());
    }

    let page = LoginTemplate {
        layout: Layout::anonymous("Sign in"),
        message: query.message.filter(|message| !message.trim().is_empty()),
        error: None,
        email: String::new(),
    };
    Ok(render(&page)?.into_response())
}

/// Check credentials and start a session under a fresh context id
pub async fn login(
    State(state): State<AppState>,
    mut scope: SessionScope,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let account = match state.users.authenticate(&form.email, &form.password) {
        Ok(account) => account,
        Err(e) => {
            info!("Login rejected for {}: {}", form.email.trim(), e);
            let page = LoginTemplate {
                layout: Layout::anonymous("Sign in"),
                message: None,
                error: Some(e.to_string()),
                email: form.email.trim().to_string(),
            };
            return Ok((e.status(), render(&page)?).into_response());
        }
    };

    let identity = login_identity(&state, &account).await;
    scope.rotate(&state).await?;
    if !scope.manager.create_session(identity) {
        return Err(WebError::Storage(
            "The session could not be saved in this browser".to_string(),
        ));
    }
    info!("{} signed in as {}", account.email, account.role);

    let response = Redirect::to(&landing_page(&scope.manager)).into_response();
    Ok(scope.with_context_cookie(response))
}

/// Identity for a verified account, with the record links its dashboard needs
async fn login_identity(state: &AppState, account: &Account) -> LoginIdentity {
    let identity = account.login_identity();

    match account.role {
        Role::Student => match state.records.student(&account.id).await {
            Ok(student) => identity.with_claim("section_id", json!(student.section_id)),
            Err(e) => {
                warn!("No student record for {}: {}", account.id, e);
                identity
            }
        },
        Role::Parent => match state.records.children_of(&account.id).await {
            Ok(children) => {
                let ids: Vec<String> = children.into_iter().map(|child| child.id).collect();
                identity.with_claim("children", json!(ids))
            }
            Err(e) => {
                warn!("Could not load children of {}: {}", account.id, e);
                identity
            }
        },
        _ => identity,
    }
}

/// End the session, drop the context id and return to the login page
pub async fn logout(State(state): State<AppState>, mut scope: SessionScope) -> WebResult<Response> {
    if let Some(record) = scope.manager.get_session() {
        info!("{} signed out", record.identity);
    }
    scope.manager.clear_session(Some(LOGGED_OUT_MESSAGE));
    scope.rotate(&state).await?;

    let fallback = scope.manager.policy().login_url(Some(LOGGED_OUT_MESSAGE));
    Ok(scope.with_context_cookie(scope.redirect_or(&fallback)))
}

/// Password change page, open to every signed-in role
pub async fn change_password_page(
    State(state): State<AppState>,
    scope: SessionScope,
) -> WebResult<Response> {
    let page = match scope.guard(state.policy.change_password_path(), Vec::new()) {
        Ok(page) => page,
        Err(redirect) => return Ok(redirect),
    };

    let template = ChangePasswordTemplate {
        layout: Layout::signed_in("Change password", &page, &state.policy),
        forced: page.record.must_change_password,
        error: None,
        min_length: MIN_PASSWORD_LENGTH,
    };
    Ok(render(&template)?.into_response())
}

/// Store a new password and lift the forced password change
pub async fn change_password(
    State(state): State<AppState>,
    scope: SessionScope,
    Form(form): Form<ChangePasswordForm>,
) -> WebResult<Response> {
    let page = match scope.guard(state.policy.change_password_path(), Vec::new()) {
        Ok(page) => page,
        Err(redirect) => return Ok(redirect),
    };

    let result = if form.new_password != form.confirm_password {
        Err(AuthError::PasswordMismatch)
    } else {
        state
            .users
            .change_password(&page.identity, &form.current_password, &form.new_password)
    };

    if let Err(e) = result {
        info!("Password change rejected for {}: {}", page.identity, e);
        let template = ChangePasswordTemplate {
            layout: Layout::signed_in("Change password", &page, &state.policy),
            forced: page.record.must_change_password,
            error: Some(e.to_string()),
            min_length: MIN_PASSWORD_LENGTH,
        };
        return Ok((e.status(), render(&template)?).into_response());
    }

    if !scope.manager.mark_password_changed() {
        warn!("Session of {} was not updated after password change", page.identity);
    }
    Ok(Redirect::to(&scope.manager.dashboard_url()).into_response())
}
