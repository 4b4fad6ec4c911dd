//! Feedback form submission.

use crate::api::FeedbackApi;
use crate::auth::FeedbackForm;
use crate::error::{FeedbackError, FEEDBACK_FAILED};

pub const FEEDBACK_THANKS: &str = "Thank you for your feedback!";

/// Validates the form and posts it. Returns the confirmation to show the user.
pub async fn send_feedback(
    api: &dyn FeedbackApi,
    form: &FeedbackForm,
) -> Result<&'static str, FeedbackError> {
    let request = form.validate().map_err(FeedbackError::Invalid)?;

    match api.send_feedback(&request).await {
        Ok(_) => {
            log::info!("Feedback ({}) submitted", request.feedback_type);
            Ok(FEEDBACK_THANKS)
        }
        Err(source) => {
            log::error!("Failed to submit feedback: {}", source);
            Err(FeedbackError::Request {
                message: source.user_message(FEEDBACK_FAILED),
                source,
            })
        }
    }
}
