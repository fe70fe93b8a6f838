use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maturity windows applied at enrollment time. Singleton record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct MaturitySettings {
    /// Weeks until a DAILY enrollment matures.
    pub daily_maturity_weeks: u32,
    /// Calendar months until a WEEKLY enrollment matures.
    pub weekly_maturity_months: u32,
}

impl Default for MaturitySettings {
    fn default() -> Self {
        Self {
            daily_maturity_weeks: 5,
            weekly_maturity_months: 3,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPosition {
    Head,
    Body,
}

/// A script the admin injects into rendered pages.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CustomScript {
    pub id: Uuid,
    pub name: String,
    pub script: String,
    pub enabled: bool,
    pub position: ScriptPosition,
}

/// Branding and support contacts. Singleton record; pushed to mounted views
/// whenever it changes.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_icon_url: Option<String>,
    pub support_whatsapp: Option<String>,
    pub support_email: Option<String>,
    pub custom_scripts: Vec<CustomScript>,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettings {
    pub fn new(site_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            site_name: site_name.into(),
            site_icon_url: None,
            support_whatsapp: None,
            support_email: None,
            custom_scripts: Vec::new(),
            updated_at: now,
        }
    }

    /// Scripts to inject for one position, in stored order, enabled only.
    pub fn scripts_for(&self, position: ScriptPosition) -> impl Iterator<Item = &CustomScript> {
        self.custom_scripts
            .iter()
            .filter(move |s| s.enabled && s.position == position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_maturity_windows() {
        let settings = MaturitySettings::default();
        assert_eq!(settings.daily_maturity_weeks, 5);
        assert_eq!(settings.weekly_maturity_months, 3);
    }

    #[test]
    fn test_scripts_for_filters_disabled_and_keeps_order() {
        let mut site = SiteSettings::new("GoPcrg", Utc::now());
        for (name, enabled, position) in [
            ("analytics", true, ScriptPosition::Head),
            ("chat", false, ScriptPosition::Head),
            ("pixel", true, ScriptPosition::Head),
            ("footer", true, ScriptPosition::Body),
        ] {
            site.custom_scripts.push(CustomScript {
                id: Uuid::new_v4(),
                name: name.to_string(),
                script: String::new(),
                enabled,
                position,
            });
        }

        let head: Vec<&str> = site
            .scripts_for(ScriptPosition::Head)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(head, vec!["analytics", "pixel"]);
    }
}
