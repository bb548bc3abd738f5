//! Safety data snapshots delivered to change listeners.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Overall severity. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    #[default]
    Unknown,
    Ok,
    Recommendation,
    CriticalWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    #[default]
    None,
    DataFetchInProgress,
    FullRescanInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SafetyCenterStatus {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity_level: SeverityLevel,
    #[serde(default)]
    pub refresh_status: RefreshStatus,
}

// ---------------------------------------------------------------------------
// Issues and entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyCenterIssue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity_level: SeverityLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyCenterEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub severity_level: SeverityLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyCenterEntryGroup {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub entries: Vec<SafetyCenterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCenterEntryOrGroup {
    Entry(SafetyCenterEntry),
    Group(SafetyCenterEntryGroup),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyCenterStaticEntry {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyCenterStaticEntryGroup {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<SafetyCenterStaticEntry>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Safety state of the device for one user at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SafetyCenterData {
    pub status: SafetyCenterStatus,
    #[serde(default)]
    pub issues: Vec<SafetyCenterIssue>,
    #[serde(default)]
    pub entries_or_groups: Vec<SafetyCenterEntryOrGroup>,
    #[serde(default)]
    pub static_entry_groups: Vec<SafetyCenterStaticEntryGroup>,
    #[serde(default)]
    pub dismissed_issues: Vec<SafetyCenterIssue>,
}

impl SafetyCenterData {
    pub fn new(status: SafetyCenterStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_issues(mut self, issues: Vec<SafetyCenterIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_dismissed_issues(mut self, dismissed: Vec<SafetyCenterIssue>) -> Self {
        self.dismissed_issues = dismissed;
        self
    }

    /// Most severe level across the status and the active issues.
    pub fn highest_severity(&self) -> SeverityLevel {
        self.issues
            .iter()
            .map(|issue| issue.severity_level)
            .chain(std::iter::once(self.status.severity_level))
            .max()
            .unwrap_or_default()
    }
}
