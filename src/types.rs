use std::str::FromStr;
use serde::Deserialize;

/// Where filesystem change notifications come from.
///
/// - `Native`: the platform watch API (inotify, FSEvents, ReadDirectoryChangesW)
///   through `notify`.
/// - `Polling`: a periodic full-directory diff. Useful on network shares and
///   other mounts where native notifications are unreliable or unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    Native,
    Polling,
}

impl Default for DetectorMode {
    fn default() -> Self {
        DetectorMode::Native
    }
}

impl FromStr for DetectorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(DetectorMode::Native),
            "polling" | "poll" => Ok(DetectorMode::Polling),
            other => Err(format!(
                "invalid detector: {other} (expected \"native\" or \"polling\")"
            )),
        }
    }
}
