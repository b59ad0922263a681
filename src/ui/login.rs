use serde::Serialize;

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::store::query::QueryState;
use crate::store::session::Session;
use crate::types::{LoginRequest, User};
use crate::ui::router::{Navigator, HOME_PATH};
use crate::ui::toaster::Toaster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPhase {
    Idle,
    Succeeded,
    Failed,
}

/// What a submission touches besides the form itself
pub struct LoginContext<'a> {
    pub client: &'a ApiClient,
    pub session: &'a Session,
    pub navigator: &'a Navigator,
    pub toaster: &'a Toaster,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginView {
    pub username: String,
    pub phase: LoginPhase,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    values: LoginRequest,
    phase: LoginPhase,
    errors: Vec<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            values: LoginRequest::default(),
            phase: LoginPhase::Idle,
            errors: Vec::new(),
        }
    }
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.values.username = username.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.values.password = password.into();
    }

    pub fn set_scope(&mut self, scope: impl Into<String>) {
        self.values.scope = scope.into();
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn view(&self) -> LoginView {
        LoginView {
            username: self.values.username.clone(),
            phase: self.phase,
            errors: self.errors.clone(),
        }
    }

    /// Exchange the credentials for a token.
    ///
    /// On success the token is stored and the visitor is sent home. On an
    /// API rejection every message in the error detail becomes its own
    /// notification and the visitor stays on the login page.
    pub async fn submit(&mut self, ctx: &LoginContext<'_>) -> LoginPhase {
        self.errors.clear();
        tracing::info!(username = %self.values.username, "submitting login");

        let outcome = match ctx.client.login_access_token(&self.values).await {
            Ok(token) => ctx
                .session
                .sign_in(token.access_token)
                .map_err(ClientError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.values.password.clear();
                self.phase = LoginPhase::Succeeded;
                ctx.navigator.navigate(HOME_PATH);
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.errors = e.messages();
                for message in &self.errors {
                    ctx.toaster.error(message.clone());
                }
                self.phase = LoginPhase::Failed;
            }
        }
        self.phase
    }
}

/// Send an already signed-in visitor away from the login page
pub fn redirect_if_authenticated(user: &QueryState<Option<User>>, navigator: &Navigator) -> bool {
    let signed_in = user.is_success() && matches!(user.data, Some(Some(_)));
    if signed_in {
        navigator.navigate(HOME_PATH);
    }
    signed_in
}
