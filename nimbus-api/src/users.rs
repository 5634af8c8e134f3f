use nimbus_lib::ids;
use nimbus_lib::size::SizeUnit;

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub total: f64,
    pub unit: SizeUnit,
}

impl Quota {
    pub fn total_bytes(&self) -> u64 {
        self.unit.to_bytes(self.total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ids::UserId,
    pub username: String,
    pub role: Role,
    pub quota: Quota,
    #[serde(default)]
    pub settings: UserSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Appearance {
    pub theme: Theme,
    pub accent_color: String,
    pub font_family: String,
    pub font_scale: f32,
    pub reduce_motion: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Appearance {
            theme: Theme::System,
            accent_color: String::from("#3b82f6"),
            font_family: String::from("system-ui"),
            font_scale: 1.0,
            reduce_motion: false,
        }
    }
}

/// preferences synchronized through `PUT /users/me/settings`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub appearance: Appearance,
    pub pinned_files: Vec<ids::FileId>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_settings_use_defaults() {
        let settings: UserSettings = serde_json::from_str(
            r#"{"appearance":{"theme":"dark"},"pinnedFiles":["f1"]}"#
        ).unwrap();

        assert_eq!(settings.appearance.theme, Theme::Dark);
        assert_eq!(settings.appearance.font_scale, 1.0);
        assert_eq!(settings.pinned_files, vec![String::from("f1")]);
    }

    #[test]
    fn profile_without_settings() {
        let profile: UserProfile = serde_json::from_str(r#"{
            "id": "u1",
            "username": "ada",
            "role": "admin",
            "quota": { "total": 10, "unit": "GB" }
        }"#).unwrap();

        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.quota.total_bytes(), SizeUnit::GB.to_bytes(10.0));
        assert_eq!(profile.settings, UserSettings::default());
    }
}
