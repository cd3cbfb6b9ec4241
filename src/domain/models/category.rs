use serde::{Deserialize, Serialize};

/// Alert category, a closed enumeration. `Unknown` is the fallback for
/// sources that cannot be mapped to a more specific bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Network,
    Compute,
    Storage,
    Application,
    Security,
    Power,
    Environment,
    Wireless,
    Video,
    Unknown,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Application => "application",
            Self::Security => "security",
            Self::Power => "power",
            Self::Environment => "environment",
            Self::Wireless => "wireless",
            Self::Video => "video",
            Self::Unknown => "unknown",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "network" => Some(Self::Network),
            "compute" => Some(Self::Compute),
            "storage" => Some(Self::Storage),
            "application" => Some(Self::Application),
            "security" => Some(Self::Security),
            "power" => Some(Self::Power),
            "environment" => Some(Self::Environment),
            "wireless" => Some(Self::Wireless),
            "video" => Some(Self::Video),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            Category::Network,
            Category::Compute,
            Category::Storage,
            Category::Application,
            Category::Security,
            Category::Power,
            Category::Environment,
            Category::Wireless,
            Category::Video,
            Category::Unknown,
        ];
        for c in all {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
    }
}
