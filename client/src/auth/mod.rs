mod session;
mod validation;

pub use session::{
    LoginRedirect, Session, SessionStatus, LOGIN_FAILED, LOGIN_PATH, LOGOUT_FAILED,
    PROFILE_FETCH_FAILED, PROFILE_UPDATE_FAILED, SIGNUP_FAILED,
};
pub use validation::{
    validate_login, validate_profile, FeedbackForm, SignupForm, MAX_PROFILE_IMAGE_BYTES,
};
