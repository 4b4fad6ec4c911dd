use shared::{ActorMode, Credentials, UserProfile};
use std::fmt;
use std::sync::Arc;

use super::validation::{self, SignupForm};
use crate::api::{AuthApi, ProfileUpdate};
use crate::config::UnauthorizedPolicy;
use crate::error::{ApiError, SessionError};

pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";
pub const PROFILE_FETCH_FAILED: &str = "Failed to fetch user profile";
pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile. Please try again.";
pub const LOGOUT_FAILED: &str = "Failed to logout. Please try again.";

/// Where to send the user to sign in, and where to bring them back afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub path: String,
    pub return_to: String,
}

impl LoginRedirect {
    pub fn to(origin: &str) -> Self {
        Self {
            path: LOGIN_PATH.to_string(),
            return_to: origin.to_string(),
        }
    }
}

impl fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?from={}", self.path, urlencoding::encode(&self.return_to))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

/// The signed-in user, if any. Passed explicitly to whatever needs the actor mode.
pub struct Session {
    api: Arc<dyn AuthApi>,
    policy: UnauthorizedPolicy,
    origin: String,
    profile: Option<UserProfile>,
    status: SessionStatus,
}

impl Session {
    pub fn new(api: Arc<dyn AuthApi>, policy: UnauthorizedPolicy, origin: impl Into<String>) -> Self {
        Self {
            api,
            policy,
            origin: origin.into(),
            profile: None,
            status: SessionStatus::Idle,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn actor_mode(&self) -> ActorMode {
        if self.profile.is_some() {
            ActorMode::Authenticated
        } else {
            ActorMode::Guest
        }
    }

    fn fail(&mut self, source: ApiError, fallback: &str) -> SessionError {
        if source.is_unauthorized() {
            self.profile = None;
        }
        let err = SessionError::request(source, fallback);
        log::error!("Session request failed: {}", err);
        self.status = SessionStatus::Failed(err.to_string());
        err
    }

    async fn load_profile(&mut self, fallback: &str) -> Result<&UserProfile, SessionError> {
        self.status = SessionStatus::Loading;
        let fetched = self.api.current_user().await;
        match fetched {
            Ok(user) => {
                log::info!("Session profile loaded for {}", user.email);
                self.status = SessionStatus::Succeeded;
                Ok(&*self.profile.insert(user))
            }
            Err(err) => Err(self.fail(err, fallback)),
        }
    }

    pub async fn refresh(&mut self) -> Result<&UserProfile, SessionError> {
        self.load_profile(PROFILE_FETCH_FAILED).await
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<&UserProfile, SessionError> {
        validation::validate_login(credentials).map_err(SessionError::Invalid)?;

        log::info!("Logging in as {}", credentials.email);
        let response = self.api.login(credentials).await;
        if let Err(err) = response {
            return Err(self.fail(err, LOGIN_FAILED));
        }
        self.load_profile(LOGIN_FAILED).await
    }

    pub async fn register(&mut self, form: &SignupForm) -> Result<&UserProfile, SessionError> {
        let signup = form.validate().map_err(SessionError::Invalid)?;

        log::info!("Registering {}", signup.email);
        let response = self.api.register(&signup).await;
        if let Err(err) = response {
            return Err(self.fail(err, SIGNUP_FAILED));
        }
        self.load_profile(SIGNUP_FAILED).await
    }

    pub async fn update_profile(
        &mut self,
        update: &ProfileUpdate,
    ) -> Result<&UserProfile, SessionError> {
        validation::validate_profile(update).map_err(SessionError::Invalid)?;

        let response = self.api.update_profile(update).await;
        if let Err(err) = response {
            return Err(self.fail(err, PROFILE_UPDATE_FAILED));
        }
        self.load_profile(PROFILE_UPDATE_FAILED).await
    }

    /// Clears the profile only once the server has confirmed the logout.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        let response = self.api.logout().await;
        match response {
            Ok(_) => {
                log::info!("Logged out");
                self.profile = None;
                self.status = SessionStatus::Idle;
                Ok(())
            }
            Err(source) => {
                log::error!("Logout error: {}", source);
                Err(SessionError::Request {
                    message: LOGOUT_FAILED.to_string(),
                    source,
                })
            }
        }
    }

    /// Applies the 401 policy to an error from any call. The profile is always
    /// dropped; a redirect is returned only under [`UnauthorizedPolicy::Redirect`].
    pub fn handle_unauthorized(&mut self, err: &ApiError) -> Option<LoginRedirect> {
        if !err.is_unauthorized() {
            return None;
        }
        log::warn!("Session is no longer authenticated");
        self.profile = None;
        self.status = SessionStatus::Idle;
        match self.policy {
            UnauthorizedPolicy::Redirect => Some(LoginRedirect::to(&self.origin)),
            UnauthorizedPolicy::Ignore => None,
        }
    }
}
