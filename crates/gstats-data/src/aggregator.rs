//! Per-user activity statistics over stored changesets and events.

use gstats_core::models::{Changeset, Event, UserStats};
use tracing::debug;

use crate::store::KeyedVec;

/// Accumulates [`UserStats`] keyed by username, in first-encounter order.
#[derive(Debug, Clone, Default)]
pub struct UserStatsBuilder {
    users: KeyedVec<UserStats>,
}

impl UserStatsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold all events, then all changesets, into fresh statistics.
    pub fn build(events: &[Event], changesets: &[Changeset]) -> Self {
        let mut builder = Self::new();
        for event in events {
            builder.add_event(event);
        }
        for cs in changesets {
            builder.add_changeset(cs);
        }
        debug!(
            "Built stats for {} users from {} events and {} changesets",
            builder.len(),
            events.len(),
            changesets.len()
        );
        builder
    }

    /// Count one message against its author.
    pub fn add_event(&mut self, event: &Event) {
        self.user_mut(&event.username).accept_event(event);
    }

    /// Count one change against its owner.
    pub fn add_changeset(&mut self, cs: &Changeset) {
        self.user_mut(&cs.owner).accept_changeset(cs);
    }

    pub fn get(&self, username: &str) -> Option<&UserStats> {
        self.users.get(username)
    }

    pub fn users(&self) -> &[UserStats] {
        self.users.as_slice()
    }

    pub fn into_users(self) -> Vec<UserStats> {
        self.users.into_vec()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn user_mut(&mut self, username: &str) -> &mut UserStats {
        self.users
            .get_or_insert_with(username, || UserStats::new(username))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gstats_core::models::ChangeStatus;

    fn make_changeset(owner: &str, status: ChangeStatus, review: &str, verify: &str) -> Changeset {
        Changeset {
            id: format!("proj~master~I{owner}{review}{verify}"),
            number: 1,
            status: Some(status),
            owner: owner.to_string(),
            review_score: review.to_string(),
            verify_score: verify.to_string(),
            ..Default::default()
        }
    }

    fn make_event(id: &str, username: &str, cs_author: &str) -> Event {
        Event {
            id: id.to_string(),
            date: "2017-04-14 23:22:56.000000000".to_string(),
            username: username.to_string(),
            cs_number: 1,
            cs_author: cs_author.to_string(),
            ..Default::default()
        }
    }

    // ── build ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_build_empty() {
        let builder = UserStatsBuilder::build(&[], &[]);
        assert!(builder.is_empty());
        assert!(builder.into_users().is_empty());
    }

    #[test]
    fn test_build_merged_owner_with_reviewers() {
        let mut events = vec![make_event("e0", "enh", "enh")];
        events.push(make_event("e1", "cferris", "enh"));
        events.push(make_event("e2", "enh", "enh"));
        events.push(make_event("e3", "ccraik", "enh"));
        events.push(make_event("e4", "cferris", "enh"));
        let changesets = vec![make_changeset("enh", ChangeStatus::Merged, "2", "2")];

        let builder = UserStatsBuilder::build(&events, &changesets);
        assert_eq!(builder.len(), 3);

        let enh = builder.get("enh").unwrap();
        assert_eq!(enh.nb_changes, 1);
        assert_eq!(enh.nb_changes_merged, 1);
        assert_eq!(enh.nb_changes_open_ready_for_review, 0);
        assert_eq!(enh.nb_events, 2);
        assert_eq!(enh.nb_own_change_events, 2);
        assert_eq!(enh.nb_3rd_party_change_events, 0);

        let cferris = builder.get("cferris").unwrap();
        assert_eq!(cferris.nb_changes, 0);
        assert_eq!(cferris.nb_events, 2);
        assert_eq!(cferris.nb_3rd_party_change_events, 2);
    }

    #[test]
    fn test_build_order_is_first_encounter() {
        let events = vec![
            make_event("e0", "zed", "amy"),
            make_event("e1", "amy", "amy"),
            make_event("e2", "zed", "amy"),
        ];
        let changesets = vec![
            make_changeset("amy", ChangeStatus::New, "1", "2"),
            make_changeset("bob", ChangeStatus::New, "", ""),
        ];

        let builder = UserStatsBuilder::build(&events, &changesets);
        let names: Vec<&str> = builder.users().iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["zed", "amy", "bob"]);
    }

    #[test]
    fn test_build_owner_without_events_has_zero_event_counters() {
        let changesets = vec![make_changeset("bob", ChangeStatus::New, "", "")];
        let builder = UserStatsBuilder::build(&[], &changesets);
        let bob = builder.get("bob").unwrap();
        assert_eq!(bob.nb_changes, 1);
        assert_eq!(bob.nb_events, 0);
        assert_eq!(bob.nb_changes_open_ready_for_review, 0);
    }

    #[test]
    fn test_build_open_change_counters() {
        let changesets = vec![
            make_changeset("amy", ChangeStatus::New, "1", "2"),
            make_changeset("amy", ChangeStatus::New, "2", "1"),
            make_changeset("amy", ChangeStatus::New, "-1", "2"),
            make_changeset("amy", ChangeStatus::Abandoned, "0", "0"),
        ];
        let builder = UserStatsBuilder::build(&[], &changesets);
        let amy = builder.get("amy").unwrap();
        assert_eq!(amy.nb_changes, 4);
        assert_eq!(amy.nb_changes_merged, 0);
        assert_eq!(amy.nb_changes_open_ready_for_review, 3);
        assert_eq!(amy.nb_changes_open_verify_plus2, 2);
    }

    #[test]
    fn test_counters_are_cumulative_across_calls() {
        let mut builder = UserStatsBuilder::new();
        builder.add_event(&make_event("e0", "amy", "bob"));
        builder.add_event(&make_event("e1", "amy", "bob"));
        assert_eq!(builder.get("amy").unwrap().nb_events, 2);
        assert_eq!(builder.len(), 1);
    }
}
