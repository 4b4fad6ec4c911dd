use lazy_static::lazy_static;
use regex::Regex;
use shared::{Credentials, FeedbackRequest, FeedbackType, ProfileFields, SignupRequest};
use std::str::FromStr;

use crate::api::ProfileUpdate;
use crate::error::FieldErrors;

pub const MAX_PROFILE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"\S+@\S+\.\S+").expect("valid regex");
}

/// Sign-up form as typed by the user. `age` is still raw text.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub email: String,
    pub password: String,
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.insert("email", "Email is invalid");
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < 6 {
        errors.insert("password", "Password must be at least 6 characters");
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.is_empty() {
        errors.insert("name", "Name is required");
    } else if name.chars().count() < 2 {
        errors.insert("name", "Name must be at least 2 characters");
    }
}

fn check_gender(errors: &mut FieldErrors, gender: &str) {
    if gender.is_empty() {
        errors.insert("gender", "Gender is required");
    }
}

fn parse_age(errors: &mut FieldErrors, raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.insert("age", "Age is required");
        return None;
    }
    match raw.parse::<f64>() {
        Ok(age) if (1.0..=120.0).contains(&age) => Some(age.trunc() as u32),
        _ => {
            errors.insert("age", "Please enter a valid age");
            None
        }
    }
}

pub fn validate_login(credentials: &Credentials) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    check_email(&mut errors, &credentials.email);
    check_password(&mut errors, &credentials.password);
    errors.into_result()
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_name(&mut errors, &self.name);
        let age = parse_age(&mut errors, &self.age);
        check_gender(&mut errors, &self.gender);
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);

        match age {
            Some(age) if errors.is_empty() => Ok(SignupRequest {
                name: self.name.clone(),
                age,
                gender: self.gender.clone(),
                email: self.email.clone(),
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Feedback form as typed by the user. `feedback_type` is the raw select value.
#[derive(Debug, Clone, Default)]
pub struct FeedbackForm {
    pub name: String,
    pub email: String,
    pub feedback_type: String,
    pub message: String,
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<FeedbackRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_name(&mut errors, &self.name);
        check_email(&mut errors, &self.email);

        let feedback_type = FeedbackType::from_str(self.feedback_type.trim()).ok();
        if feedback_type.is_none() {
            errors.insert("feedbackType", "Please select a feedback type");
        }
        if self.message.is_empty() {
            errors.insert("message", "Message is required");
        } else if self.message.chars().count() < 10 {
            errors.insert("message", "Message must be at least 10 characters");
        }

        match feedback_type {
            Some(feedback_type) if errors.is_empty() => Ok(FeedbackRequest {
                name: self.name.clone(),
                email: self.email.clone(),
                feedback_type,
                message: self.message.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Profile edits: the sign-up rules minus the password, plus weight and avatar size.
pub fn validate_profile(update: &ProfileUpdate) -> Result<(), FieldErrors> {
    let ProfileFields {
        name,
        age,
        gender,
        email,
        weight,
        ..
    } = &update.fields;

    let mut errors = FieldErrors::default();
    check_name(&mut errors, name);
    match age {
        None => errors.insert("age", "Age is required"),
        Some(age) if !(1..=120).contains(age) => errors.insert("age", "Please enter a valid age"),
        Some(_) => {}
    }
    check_gender(&mut errors, gender);
    check_email(&mut errors, email);

    if let Some(weight) = weight.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        let valid = weight
            .parse::<f64>()
            .is_ok_and(|w| (1.0..=500.0).contains(&w));
        if !valid {
            errors.insert("weight", "Please enter a valid weight");
        }
    }
    if let Some(image) = &update.profile_image {
        if image.len() > MAX_PROFILE_IMAGE_BYTES {
            errors.insert("profileImage", "Image size should be less than 5MB");
        }
    }
    errors.into_result()
}
