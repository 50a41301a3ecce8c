use std::fmt;

/// Durable enablement flag of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Enabled,
    Disabled,
}

impl PluginState {
    pub fn as_str(&self) -> &str {
        match self {
            PluginState::Enabled => "enabled",
            PluginState::Disabled => "disabled",
        }
    }

    /// Anything other than `enabled` counts as disabled
    pub fn parse(state: &str) -> Self {
        if state == "enabled" {
            PluginState::Enabled
        } else {
            PluginState::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == PluginState::Enabled
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted plugin row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    pub name: String,
    pub state: PluginState,
}

impl fmt::Display for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.state)
    }
}
