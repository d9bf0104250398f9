//! Device normalization.
//!
//! Raw events carry free-text platform identifiers ("iPhone 15", "android-app",
//! "wxapp", ...). Statistics dimensions use a fixed device enum; normalization
//! is total and never fails.

use serde::{Deserialize, Serialize};

/// Canonical device dimension values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Web,
    Ios,
    Android,
    Wap,
    Miniprogram,
    #[default]
    Other,
}

impl Device {
    /// All enum values, in dimension ordering.
    pub const ALL: [Device; 6] = [
        Device::Web,
        Device::Ios,
        Device::Android,
        Device::Wap,
        Device::Miniprogram,
        Device::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Wap => "wap",
            Self::Miniprogram => "miniprogram",
            Self::Other => "other",
        }
    }

    /// Canonicalize a raw platform identifier.
    ///
    /// Matching order: exact enum name, then substring heuristics (iOS,
    /// Android, desktop web, mobile web, mini-program), else `Other`.
    pub fn normalize(raw: Option<&str>) -> Device {
        let raw = match raw {
            Some(s) => s.trim().to_ascii_lowercase(),
            None => return Device::Other,
        };
        if raw.is_empty() {
            return Device::Other;
        }

        match raw.as_str() {
            "web" => return Device::Web,
            "ios" => return Device::Ios,
            "android" => return Device::Android,
            "wap" => return Device::Wap,
            "miniprogram" => return Device::Miniprogram,
            "other" => return Device::Other,
            _ => {}
        }

        const IOS: &[&str] = &["iphone", "ipad", "ipod", "ios"];
        const ANDROID: &[&str] = &["android"];
        const WEB: &[&str] = &["web", "pc", "desktop", "windows", "mac", "browser"];
        const WAP: &[&str] = &["wap", "h5", "mobile"];
        const MINIPROGRAM: &[&str] = &["miniprogram", "mini-program", "mini_program", "wxapp", "weapp", "applet"];

        let contains_any = |needles: &[&str]| needles.iter().any(|n| raw.contains(n));

        if contains_any(IOS) {
            Device::Ios
        } else if contains_any(ANDROID) {
            Device::Android
        } else if contains_any(MINIPROGRAM) {
            // Before WEB: "wxapp-web-view" is still the mini-program runtime.
            Device::Miniprogram
        } else if contains_any(WAP) {
            Device::Wap
        } else if contains_any(WEB) {
            Device::Web
        } else {
            Device::Other
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
