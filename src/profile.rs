//! The signed-in user's profile, kept in the key-value table.
//!
//! Updates follow merge-item semantics: the patch is deep-merged into the
//! stored JSON object, so fields absent from the patch keep their values.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::app_response::AppResponse;
use crate::local_db_model::LocalDbModel;
use crate::local_db_state::AppDbState;

pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailNotification {
    pub order_status: bool,
    pub password_change: bool,
    pub special_offer: bool,
    pub newsletter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub email_notification: EmailNotification,
}

impl UserProfile {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn initials(&self) -> String {
        crate::text::name_initials(&self.first_name, &self.last_name)
    }
}

/// Partial profile update; only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notification: Option<EmailNotification>,
}

impl UserProfilePatch {
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(v) = &self.first_name {
            profile.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            profile.last_name = v.clone();
        }
        if let Some(v) = &self.email {
            profile.email = v.clone();
        }
        if let Some(v) = &self.phone {
            profile.phone = Some(v.clone());
        }
        if let Some(v) = &self.image {
            profile.image = Some(v.clone());
        }
        if let Some(v) = &self.email_notification {
            profile.email_notification = v.clone();
        }
    }
}

/// Deep-merges `patch` into `target`. Objects merge key by key; any other
/// value replaces what was there.
pub fn merge_json(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(existing), JsonValue::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<AppDbState>,
}

impl ProfileStore {
    pub fn new(db: Arc<AppDbState>) -> Self {
        Self { db }
    }

    /// Stores `profile` as the signed-in user, replacing any previous one.
    pub fn onboard(&self, profile: &UserProfile) -> Result<(), AppResponse> {
        let data = serde_json::to_value(profile)?;
        self.write(data, 1)?;
        info!("User onboarded");
        Ok(())
    }

    pub fn get_user(&self) -> Result<Option<UserProfile>, AppResponse> {
        match self.db.get_by_id(USER_KEY)? {
            Some(model) => Ok(Some(serde_json::from_value(model.data)?)),
            None => Ok(None),
        }
    }

    /// Merges `patch` into the stored user and returns the result.
    pub fn update_user(&self, patch: &UserProfilePatch) -> Result<UserProfile, AppResponse> {
        self.merge(serde_json::to_value(patch)?)
    }

    /// Sets the avatar URI; an empty string removes the picture.
    pub fn update_image(&self, uri: &str) -> Result<UserProfile, AppResponse> {
        let mut patch = Map::new();
        patch.insert("image".to_string(), JsonValue::String(uri.to_string()));
        self.merge(JsonValue::Object(patch))
    }

    /// Forgets the signed-in user. Signing out twice is not an error.
    pub fn sign_out(&self) -> Result<bool, AppResponse> {
        let removed = self.db.delete_by_id(USER_KEY)?;
        info!("User signed out (profile present: {removed})");
        Ok(removed)
    }

    fn merge(&self, patch: JsonValue) -> Result<UserProfile, AppResponse> {
        let current = self.db.get_by_id(USER_KEY)?;
        let (mut data, revision) = match current {
            Some(model) => (model.data, revision_of(&model.hash) + 1),
            None => (JsonValue::Object(Map::new()), 1),
        };
        merge_json(&mut data, patch);
        let profile: UserProfile = serde_json::from_value(data.clone())?;
        self.write(data, revision)?;
        Ok(profile)
    }

    fn write(&self, data: JsonValue, revision: u64) -> Result<(), AppResponse> {
        self.db.put(LocalDbModel {
            id: USER_KEY.to_string(),
            hash: format!("rev-{revision}"),
            data,
        })?;
        Ok(())
    }

    /// Revision tag of the stored profile, if any.
    pub fn revision(&self) -> Result<Option<u64>, AppResponse> {
        Ok(self.db.get_by_id(USER_KEY)?.map(|m| revision_of(&m.hash)))
    }
}

fn revision_of(hash: &str) -> u64 {
    hash.strip_prefix("rev-").and_then(|n| n.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_json_is_deep() {
        let mut target = json!({"a": 1, "nested": {"x": true, "y": false}});
        merge_json(&mut target, json!({"nested": {"y": true}, "b": "new"}));
        assert_eq!(target, json!({"a": 1, "b": "new", "nested": {"x": true, "y": true}}));
    }

    #[test]
    fn merge_json_replaces_non_objects() {
        let mut target = json!({"list": [1, 2]});
        merge_json(&mut target, json!({"list": [3]}));
        assert_eq!(target, json!({"list": [3]}));
    }

    #[test]
    fn profile_uses_camel_case_keys() {
        let mut profile = UserProfile::new("Tilly", "Doe", "tilly@example.com");
        profile.email_notification.special_offer = true;
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["firstName"], "Tilly");
        assert_eq!(value["emailNotification"]["specialOffer"], true);
        assert!(value.get("phone").is_none());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut profile = UserProfile::new("Tilly", "Doe", "tilly@example.com");
        let patch = UserProfilePatch {
            phone: Some("(217) 555-0113".to_string()),
            ..UserProfilePatch::default()
        };
        patch.apply_to(&mut profile);
        assert_eq!(profile.first_name, "Tilly");
        assert_eq!(profile.phone.as_deref(), Some("(217) 555-0113"));
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"phone": "(217) 555-0113"}));
    }
}
