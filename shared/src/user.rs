use serde::de::{self as serde_de, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::de;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "de::optional_whole", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "de::optional_number", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub diseases: Vec<String>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl UserProfile {
    /// Share of the eight profile fields that are filled in, rounded to a whole percent.
    pub fn completion_percent(&self) -> u8 {
        let filled = [
            !self.name.is_empty(),
            self.age.is_some(),
            self.gender.as_deref().is_some_and(|g| !g.is_empty()),
            !self.email.is_empty(),
            self.weight.is_some(),
            self.profile_image.as_deref().is_some_and(|p| !p.is_empty()),
            !self.diseases.is_empty(),
            !self.allergies.is_empty(),
        ];
        let count = filled.iter().filter(|f| **f).count();
        ((count as f64 / filled.len() as f64) * 100.0).round() as u8
    }
}

/// `/auth/me` has been observed both wrapped in `{ user }` and bare.
///
/// A bare body only counts as a user when it carries an `email` or `_id`, and a
/// `{ "user": null }` body is rejected, so a malformed response never yields an
/// empty signed-in profile.
#[derive(Debug, Clone, PartialEq)]
pub enum MeResponse {
    Wrapped(UserProfile),
    Bare(UserProfile),
}

impl MeResponse {
    pub fn into_user(self) -> UserProfile {
        match self {
            MeResponse::Wrapped(user) => user,
            MeResponse::Bare(user) => user,
        }
    }
}

impl<'de> Deserialize<'de> for MeResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        if let Some(user) = body.remove("user") {
            if user.is_null() {
                return Err(serde_de::Error::custom("response carries a null user"));
            }
            return UserProfile::deserialize(user)
                .map(MeResponse::Wrapped)
                .map_err(serde_de::Error::custom);
        }

        let identified = ["email", "_id", "id"]
            .iter()
            .any(|key| body.get(*key).is_some_and(|v| !v.is_null()));
        if !identified {
            return Err(serde_de::Error::custom("response carries no user"));
        }
        UserProfile::deserialize(Value::Object(body))
            .map(MeResponse::Bare)
            .map_err(serde_de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub email: String,
    pub password: String,
}

/// Editable profile fields sent to `PUT /auth/me`. Empty optionals are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub name: String,
    pub age: Option<u32>,
    pub gender: String,
    pub email: String,
    pub password: Option<String>,
    pub weight: Option<String>,
    pub diseases: Vec<String>,
    pub allergies: Vec<String>,
}

impl From<&UserProfile> for ProfileFields {
    fn from(user: &UserProfile) -> Self {
        Self {
            name: user.name.clone(),
            age: user.age,
            gender: user.gender.clone().unwrap_or_default(),
            email: user.email.clone(),
            password: None,
            weight: user.weight.map(|w| w.to_string()),
            diseases: user.diseases.clone(),
            allergies: user.allergies.clone(),
        }
    }
}
