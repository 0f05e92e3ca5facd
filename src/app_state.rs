//! Application-wide state handed to every screen by the host.
//!
//! Owned by a [`crate::MenuCacheHandle`] and changed only through
//! [`AppStateStore::replace`] or [`AppStateStore::merge`]; each accepted
//! change bumps the revision so observers can tell a fresh snapshot from a
//! stale one.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::profile::{ProfileStore, UserProfile, UserProfilePatch};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub is_onboarding_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_onboarding_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfilePatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppStateSnapshot {
    pub revision: u64,
    pub state: AppState,
}

#[derive(Debug, Default)]
pub struct AppStateStore {
    state: AppState,
    revision: u64,
}

impl AppStateStore {
    pub fn new(state: AppState) -> Self {
        Self { state, revision: 0 }
    }

    /// Startup state: onboarding counts as completed iff a user is stored.
    pub fn load(profiles: &ProfileStore) -> Result<Self, AppResponse> {
        let user = profiles.get_user()?;
        Ok(Self::new(AppState {
            is_onboarding_completed: user.is_some(),
            user,
        }))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> AppStateSnapshot {
        AppStateSnapshot {
            revision: self.revision,
            state: self.state.clone(),
        }
    }

    pub fn replace(&mut self, state: AppState) -> u64 {
        self.state = state;
        self.bump()
    }

    /// Applies the fields present in `patch`. The user is merged field-wise;
    /// a user patch on a state without a user starts from an empty profile.
    /// Returns the new revision, or the current one when nothing changed.
    pub fn merge(&mut self, patch: AppStatePatch) -> u64 {
        let before = self.state.clone();
        if let Some(done) = patch.is_onboarding_completed {
            self.state.is_onboarding_completed = done;
        }
        if let Some(user_patch) = patch.user {
            let user = self.state.user.get_or_insert_with(UserProfile::default);
            user_patch.apply_to(user);
        }
        if self.state == before {
            return self.revision;
        }
        self.bump()
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_everything() {
        let mut store = AppStateStore::new(AppState {
            is_onboarding_completed: true,
            user: Some(UserProfile::new("Tilly", "Doe", "t@example.com")),
        });
        let rev = store.replace(AppState::default());
        assert_eq!(rev, 1);
        assert_eq!(store.state(), &AppState::default());
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut store = AppStateStore::new(AppState {
            is_onboarding_completed: true,
            user: Some(UserProfile::new("Tilly", "Doe", "t@example.com")),
        });
        let rev = store.merge(AppStatePatch {
            user: Some(UserProfilePatch {
                image: Some("file:///avatar.png".to_string()),
                ..UserProfilePatch::default()
            }),
            ..AppStatePatch::default()
        });
        assert_eq!(rev, 1);
        assert!(store.state().is_onboarding_completed);
        let user = store.state().user.as_ref().unwrap();
        assert_eq!(user.first_name, "Tilly");
        assert_eq!(user.image.as_deref(), Some("file:///avatar.png"));
    }

    #[test]
    fn noop_merge_keeps_revision() {
        let mut store = AppStateStore::default();
        assert_eq!(store.merge(AppStatePatch::default()), 0);
        assert_eq!(
            store.merge(AppStatePatch {
                is_onboarding_completed: Some(false),
                ..AppStatePatch::default()
            }),
            0
        );
        assert_eq!(store.snapshot().revision, 0);
    }

    #[test]
    fn patch_deserializes_from_camel_case() {
        let patch: AppStatePatch =
            serde_json::from_str(r#"{"isOnboardingCompleted":true,"user":{"firstName":"Ana"}}"#).unwrap();
        assert_eq!(patch.is_onboarding_completed, Some(true));
        assert_eq!(patch.user.unwrap().first_name.as_deref(), Some("Ana"));
    }
}
