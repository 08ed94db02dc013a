use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::formatting::format_ratio;

/// Lifecycle state of a Gerrit change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Open and under review.
    New,
    /// Submitted into the target branch.
    Merged,
    /// Closed without being merged.
    Abandoned,
    /// Not yet published for review.
    Draft,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::New => "new",
            ChangeStatus::Merged => "merged",
            ChangeStatus::Abandoned => "abandoned",
            ChangeStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeStatus {
    type Err = String;

    /// Case-insensitive: Gerrit reports `NEW`, `MERGED`, ... in upper case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ChangeStatus::New),
            "merged" => Ok(ChangeStatus::Merged),
            "abandoned" => Ok(ChangeStatus::Abandoned),
            "draft" => Ok(ChangeStatus::Draft),
            other => Err(format!("unknown change status: {other}")),
        }
    }
}

/// A normalized Gerrit change, one per raw `ChangeInfo` record.
///
/// The allow-listed optional fields stay `None` when the source record does
/// not carry them; consumers must not read a missing field as a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    /// Globally unique change id (`project~branch~Change-Id`).
    #[serde(default)]
    pub id: String,
    /// Numeric change number (`_number`).
    #[serde(default)]
    pub number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChangeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submittable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mergeable: Option<bool>,
    /// Resolved username of the change owner.
    #[serde(default)]
    pub owner: String,
    /// `Code-Review` score, `""` when the label is absent.
    #[serde(default)]
    pub review_score: String,
    /// `Verified` (or deployment alias) score, `""` when absent.
    #[serde(default)]
    pub verify_score: String,
    /// `Priority` score, `""` when absent.
    #[serde(default)]
    pub priority_score: String,
}

impl Changeset {
    pub fn is_merged(&self) -> bool {
        self.status == Some(ChangeStatus::Merged)
    }
}

/// One review message posted on a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    /// Raw Gerrit timestamp, e.g. `2017-04-14 23:22:56.000000000`.
    #[serde(default)]
    pub date: String,
    /// Milliseconds since the Unix epoch, derived from `date` in the
    /// configured timezone. `None` when the date could not be parsed.
    #[serde(default)]
    pub epoch: Option<i64>,
    #[serde(default)]
    pub username: String,
    /// Raw message body; dropped when message stripping is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Patch set number mined from the message, `""` when not found.
    #[serde(default)]
    pub ps_number: String,
    /// Code-Review vote mined from the message, `""` when not found.
    #[serde(default)]
    pub review_score: String,
    /// Number of the owning change.
    #[serde(default)]
    pub cs_number: i64,
    /// Owner of the owning change.
    #[serde(default)]
    pub cs_author: String,
}

impl Event {
    /// `true` when the author of the message also owns the change.
    pub fn is_own_change(&self) -> bool {
        self.username == self.cs_author
    }
}

/// Scores that block a change from being "ready for review".
const BLOCKING_SCORES: &[&str] = &["", "-1", "-2"];

/// Per-user activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub username: String,
    pub nb_changes: u32,
    pub nb_changes_merged: u32,
    pub nb_changes_open_ready_for_review: u32,
    pub nb_changes_open_verify_plus2: u32,
    /// All messages written by the user.
    pub nb_events: u32,
    /// Messages on changes the user owns.
    pub nb_own_change_events: u32,
    /// Messages on changes owned by somebody else.
    pub nb_3rd_party_change_events: u32,
}

impl UserStats {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Count a change owned by this user.
    pub fn accept_changeset(&mut self, cs: &Changeset) {
        self.nb_changes += 1;

        if cs.is_merged() {
            self.nb_changes_merged += 1;
            return;
        }

        if !BLOCKING_SCORES.contains(&cs.review_score.as_str())
            && !BLOCKING_SCORES.contains(&cs.verify_score.as_str())
        {
            self.nb_changes_open_ready_for_review += 1;
        }

        if cs.verify_score == "2" {
            self.nb_changes_open_verify_plus2 += 1;
        }
    }

    /// Count a message written by this user.
    pub fn accept_event(&mut self, event: &Event) {
        self.nb_events += 1;
        if event.is_own_change() {
            self.nb_own_change_events += 1;
        } else {
            self.nb_3rd_party_change_events += 1;
        }
    }

    /// Third-party messages per owned change.
    pub fn third_party_events_per_change(&self) -> String {
        format_ratio(self.nb_3rd_party_change_events, self.nb_changes)
    }

    /// Share of the user's messages that target other people's changes.
    pub fn third_party_events_share(&self) -> String {
        format_ratio(self.nb_3rd_party_change_events, self.nb_events)
    }

    /// Fixed CSV header matching [`UserStats::to_csv_row`].
    pub fn csv_header() -> &'static str {
        "username,nbChanges,nbChangesMerged,nbChangesOpenReadyForReview,nbChangesOpenVerifyPlus2,\
nbEvents,nbOwnChangeEvents,nb3rdPartyChangeEvents,\
eventsTowards3PartyOverOwnChangesCountRatio,eventsTowards3PartyOverEventsCount,\n"
    }

    /// One CSV data row, trailing comma included.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},\n",
            self.username,
            self.nb_changes,
            self.nb_changes_merged,
            self.nb_changes_open_ready_for_review,
            self.nb_changes_open_verify_plus2,
            self.nb_events,
            self.nb_own_change_events,
            self.nb_3rd_party_change_events,
            self.third_party_events_per_change(),
            self.third_party_events_share(),
        )
    }
}
