//! Browser context middleware and the per-request session scope

use crate::{AppState, BrowserContext, WebError, WebResult, CONTEXT_COOKIE};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use schooldesk_core::Role;
use schooldesk_session::{
    PageContext, RecordingNavigator, RouteGuard, SessionLifecycleManager, EXPIRED_MESSAGE,
};
use std::sync::Arc;
use tracing::debug;

/// Response extension asking for the context cookie to be reissued
#[derive(Debug, Clone)]
struct RotatedContext(String);

/// Resolve the browser context of the request and attach it.
///
/// A context cookie is set whenever a new id had to be issued, or when the
/// handler moved the session to a new context.
pub async fn browser_context_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = jar.get(CONTEXT_COOKIE).map(|cookie| cookie.value().to_string());

    let (context, issued) = match state.contexts.resolve(cookie.as_deref()).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(context.clone());
    let mut response = next.run(request).await;

    let reissue = match response.extensions_mut().remove::<RotatedContext>() {
        Some(RotatedContext(id)) => Some(id),
        None if issued => Some(context.id().to_string()),
        None => None,
    };

    if let Some(id) = reissue {
        debug!("Issuing browser context cookie {}", id);
        let cookie = Cookie::build((CONTEXT_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

/// Session lifecycle manager bound to the browser context of one request.
///
/// Redirects requested by the manager are captured and turned into HTTP
/// redirects by the handler.
pub struct SessionScope {
    pub context: Arc<BrowserContext>,
    pub manager: SessionLifecycleManager,
    navigator: Arc<RecordingNavigator>,
}

impl SessionScope {
    pub fn new(context: Arc<BrowserContext>, state: &AppState) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = Self::bind(&context, state, navigator.clone());
        Self {
            context,
            manager,
            navigator,
        }
    }

    fn bind(
        context: &BrowserContext,
        state: &AppState,
        navigator: Arc<RecordingNavigator>,
    ) -> SessionLifecycleManager {
        SessionLifecycleManager::new(
            context.store(),
            state.policy.clone(),
            state.clock.clone(),
            navigator,
        )
    }

    /// Move to a fresh browser context, emptying the current one.
    ///
    /// Pass the handler's response through [`SessionScope::with_context_cookie`]
    /// so the browser learns the new id.
    pub async fn rotate(&mut self, state: &AppState) -> WebResult<()> {
        let fresh = state.contexts.rotate(&self.context).await?;
        self.manager = Self::bind(&fresh, state, self.navigator.clone());
        self.context = fresh;
        Ok(())
    }

    /// Have the middleware send the current context id as a new cookie
    pub fn with_context_cookie(&self, mut response: Response) -> Response {
        response
            .extensions_mut()
            .insert(RotatedContext(self.context.id().to_string()));
        response
    }

    /// Whether the revalidation sweep ended this context's session and no
    /// page has reported it yet. Reporting it clears the notice.
    pub fn take_sweep_expiry(&self) -> bool {
        self.manager.get_session().is_none() && self.context.take_expiry_notice()
    }

    /// Run the route guard for `page`.
    ///
    /// On failure the redirect the guard asked for is returned as the
    /// response to send.
    pub fn guard(&self, page: &str, allowed: Vec<Role>) -> Result<PageContext, Response> {
        if self.take_sweep_expiry() {
            let target = self.manager.policy().login_url(Some(EXPIRED_MESSAGE));
            return Err(Redirect::to(&target).into_response());
        }

        RouteGuard::new(page, allowed)
            .check(&self.manager)
            .ok_or_else(|| self.redirect_or(&self.manager.policy().login_url(None)))
    }

    /// Last redirect requested through the manager, if any
    pub fn redirect_target(&self) -> Option<String> {
        self.navigator.last()
    }

    /// Follow the manager's redirect, or go to `fallback`
    pub fn redirect_or(&self, fallback: &str) -> Response {
        let target = self
            .redirect_target()
            .unwrap_or_else(|| fallback.to_string());
        Redirect::to(&target).into_response()
    }
}

impl FromRequestParts<AppState> for SessionScope {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<Arc<BrowserContext>>()
            .cloned()
            .ok_or_else(|| WebError::Internal("browser context missing from request".to_string()))?;

        Ok(Self::new(context, state))
    }
}
