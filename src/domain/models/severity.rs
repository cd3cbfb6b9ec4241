use serde::{Deserialize, Serialize};

/// Alert severity, a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Clear,
    Info,
    Warning,
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clear" => Some(Self::Clear),
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "minor" => Some(Self::Minor),
            "major" => Some(Self::Major),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for s in [
            Severity::Clear,
            Severity::Info,
            Severity::Warning,
            Severity::Minor,
            Severity::Major,
            Severity::Critical,
        ] {
            assert_eq!(Severity::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn unknown_value_is_none() {
        assert_eq!(Severity::from_str("bogus"), None);
    }

    #[test]
    fn default_is_warning() {
        assert_eq!(Severity::default(), Severity::Warning);
    }
}
