//! The signed-in user record.

use crate::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the signed-in user as persisted on the device.
///
/// The record is opaque beyond the fields named here: anything else the
/// identity provider or backend attached survives a storage round trip in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Stable identifier from the identity provider.
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Phone number attached by the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Phone number kept by the backend profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Backend profile id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: None,
            photo_url: None,
            phone_number: None,
            phone: None,
            backend_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Reject records that cannot identify a user.
    pub fn validate(&self) -> SessionResult<()> {
        if self.uid.trim().is_empty() {
            return Err(SessionError::InvalidUser("uid is empty".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(SessionError::InvalidUser("email is empty".to_string()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> SessionResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SessionResult<Self> {
        let user: Self = serde_json::from_str(json)?;
        user.validate()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let mut user = UserRecord::new("u1", "a@b.com").with_display_name("Ana");
        user.photo_url = Some("https://x/p.png".to_string());
        user.backend_id = Some("665f".to_string());

        let value: Value = serde_json::from_str(&user.to_json().unwrap()).unwrap();
        assert_eq!(value["uid"], "u1");
        assert_eq!(value["displayName"], "Ana");
        assert_eq!(value["photoURL"], "https://x/p.png");
        assert_eq!(value["_id"], "665f");
        assert!(value.get("phone").is_none());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"uid":"u1","email":"a@b.com","emailVerified":true,"providerId":"firebase"}"#;
        let user = UserRecord::from_json(json).unwrap();
        assert_eq!(user.extra.get("emailVerified"), Some(&Value::Bool(true)));

        let again = UserRecord::from_json(&user.to_json().unwrap()).unwrap();
        assert_eq!(again, user);
    }

    #[test]
    fn test_validation() {
        assert!(UserRecord::new("u1", "a@b.com").validate().is_ok());
        assert!(matches!(
            UserRecord::new("", "a@b.com").validate(),
            Err(SessionError::InvalidUser(_))
        ));
        assert!(matches!(
            UserRecord::new("u1", "  ").validate(),
            Err(SessionError::InvalidUser(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed_records() {
        assert!(matches!(
            UserRecord::from_json("not json"),
            Err(SessionError::Parse(_))
        ));
        assert!(matches!(
            UserRecord::from_json(r#"{"email":"a@b.com"}"#),
            Err(SessionError::Parse(_))
        ));
        assert!(matches!(
            UserRecord::from_json(r#"{"uid":"","email":"a@b.com"}"#),
            Err(SessionError::InvalidUser(_))
        ));
    }
}
