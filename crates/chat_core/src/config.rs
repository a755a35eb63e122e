use std::fs;

/// Policy switches for the join flow. Both default to off: the plain flow
/// joins every missing conversation without gating or renaming, matching
/// deployments that carry no attribute hints.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerSettings {
    /// Skip joining when the desired conversation's numeric attribute
    /// equals the live message count. The attribute's meaning is opaque;
    /// the comparison is preserved as configured policy, nothing more.
    pub gate_on_message_count: bool,
    /// Derive a display name from the first message's author when it
    /// parses as a phone number, set before joining.
    pub rename_from_author_number: bool,
}

impl ReconcilerSettings {
    pub fn from_toml_str(raw: &str) -> Self {
        let mut settings = Self::default();
        if let Ok(value) = raw.parse::<toml::Value>() {
            if let Some(v) = value.get("gate_on_message_count").and_then(|v| v.as_bool()) {
                settings.gate_on_message_count = v;
            }
            if let Some(v) = value
                .get("rename_from_author_number")
                .and_then(|v| v.as_bool())
            {
                settings.rename_from_author_number = v;
            }
        }
        settings
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Merges the settings file with environment overrides. A present variable
/// is authoritative for its flag, whatever the file says.
fn resolve(raw: Option<&str>, env: impl Fn(&str) -> Option<String>) -> ReconcilerSettings {
    let mut settings = raw
        .map(ReconcilerSettings::from_toml_str)
        .unwrap_or_default();

    if let Some(value) = env("APP__GATE_ON_MESSAGE_COUNT") {
        settings.gate_on_message_count = flag(&value);
    }
    if let Some(value) = env("APP__RENAME_FROM_AUTHOR_NUMBER") {
        settings.rename_from_author_number = flag(&value);
    }

    settings
}

pub fn load_settings() -> ReconcilerSettings {
    let raw = fs::read_to_string("client.toml").ok();
    resolve(raw.as_deref(), |name| std::env::var(name).ok())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
