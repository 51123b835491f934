//! Staged relationship edits and their reconciliation with storage.
//!
//! A form edits an entity's join rows locally: every insert, update or
//! delete is staged in an [`ActionLog`] keyed by row id. On submit the log
//! is split into three batches ([`separate_actions_log`]) that the caller
//! writes in one transaction. While the form is open, a server refresh is
//! folded in with [`merge_relationships`] so unsaved edits survive it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::OrganizationId;

/// A row that can be staged in an [`ActionLog`].
pub trait LoggedRow: Clone + fmt::Debug + PartialEq {
    type Id: Clone + Ord + fmt::Debug;
    type Update: Clone + fmt::Debug + PartialEq;

    fn row_id(&self) -> &Self::Id;

    fn update_id(update: &Self::Update) -> &Self::Id;

    fn set_organization_id(&mut self, organization_id: &OrganizationId);

    fn apply_update(&mut self, update: &Self::Update);
}

/// A join row whose `relationship` value is user-editable.
pub trait Relationship: LoggedRow {
    type Kind: Clone + fmt::Debug + PartialEq;

    fn relationship(&self) -> &Self::Kind;

    fn set_relationship(&mut self, kind: Self::Kind);

    /// The relationship value an update would set, if any.
    fn relationship_override(update: &Self::Update) -> Option<&Self::Kind>;

    /// An update that only changes the relationship value.
    fn kind_update(id: Self::Id, kind: Self::Kind) -> Self::Update;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "UPPERCASE",
    bound(
        serialize = "R: Serialize, R::Update: Serialize, R::Id: Serialize",
        deserialize = "R: Deserialize<'de>, R::Update: Deserialize<'de>, R::Id: Deserialize<'de>"
    )
)]
pub enum RelationshipAction<R: LoggedRow> {
    Insert(R),
    Update(R::Update),
    Delete(R::Id),
}

/// Pending edits, at most one per row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "R: Serialize, R::Update: Serialize, R::Id: Serialize",
        deserialize = "R: Deserialize<'de>, R::Update: Deserialize<'de>, R::Id: Deserialize<'de>"
    )
)]
pub struct ActionLog<R: LoggedRow> {
    actions: BTreeMap<R::Id, RelationshipAction<R>>,
}

impl<R: LoggedRow> Default for ActionLog<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: LoggedRow> ActionLog<R> {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    /// Stage a new row. Replaces whatever was staged for the same id.
    pub fn stage_insert(&mut self, row: R) {
        self.actions
            .insert(row.row_id().clone(), RelationshipAction::Insert(row));
    }

    /// Stage an update. An update to a row that has not been saved yet is
    /// folded into its staged insert, which stays an insert.
    pub fn stage_update(&mut self, update: R::Update) {
        let id = R::update_id(&update).clone();
        if let Some(RelationshipAction::Insert(row)) = self.actions.get_mut(&id) {
            row.apply_update(&update);
            return;
        }
        self.actions.insert(id, RelationshipAction::Update(update));
    }

    /// Stage a delete. Deleting a row that only exists as a staged insert
    /// drops the entry: there is nothing to delete server-side.
    pub fn stage_delete(&mut self, id: R::Id) {
        if let Some(RelationshipAction::Insert(_)) = self.actions.get(&id) {
            self.actions.remove(&id);
            return;
        }
        self.actions
            .insert(id.clone(), RelationshipAction::Delete(id));
    }

    pub fn get(&self, id: &R::Id) -> Option<&RelationshipAction<R>> {
        self.actions.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&R::Id, &RelationshipAction<R>)> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn partition(&self, organization_id: &OrganizationId) -> ActionLogPartition<R> {
        separate_actions_log(self, organization_id)
    }
}

impl<R: LoggedRow> FromIterator<RelationshipAction<R>> for ActionLog<R> {
    fn from_iter<I: IntoIterator<Item = RelationshipAction<R>>>(iter: I) -> Self {
        let mut log = Self::new();
        for action in iter {
            match action {
                RelationshipAction::Insert(row) => log.stage_insert(row),
                RelationshipAction::Update(update) => log.stage_update(update),
                RelationshipAction::Delete(id) => log.stage_delete(id),
            }
        }
        log
    }
}

/// The three write batches for one submit.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionLogPartition<R: LoggedRow> {
    pub inserts: Vec<R>,
    pub updates: Vec<R::Update>,
    pub deletes: Vec<R::Id>,
}

impl<R: LoggedRow> ActionLogPartition<R> {
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a log into insert, update and delete batches. Inserted rows are
/// stamped with `organization_id`. Payloads are not validated here.
pub fn separate_actions_log<R: LoggedRow>(
    actions: &ActionLog<R>,
    organization_id: &OrganizationId,
) -> ActionLogPartition<R> {
    let mut partition = ActionLogPartition {
        inserts: Vec::new(),
        updates: Vec::new(),
        deletes: Vec::new(),
    };
    for action in actions.actions.values() {
        match action {
            RelationshipAction::Insert(row) => {
                let mut row = row.clone();
                row.set_organization_id(organization_id);
                partition.inserts.push(row);
            }
            RelationshipAction::Update(update) => partition.updates.push(update.clone()),
            RelationshipAction::Delete(id) => partition.deletes.push(id.clone()),
        }
    }
    partition
}

/// Fold a server snapshot into the client's view without losing staged
/// edits.
///
/// Server rows replace local rows, except that a staged update's
/// `relationship` value is laid over the server row. Rows the server does
/// not know about yet (staged inserts) are kept as they are. The result is
/// ordered by row id.
pub fn merge_relationships<R: Relationship>(
    current: &[R],
    server_updates: &[R],
    actions: &ActionLog<R>,
) -> Vec<R> {
    let mut merged: BTreeMap<R::Id, R> = current
        .iter()
        .map(|row| (row.row_id().clone(), row.clone()))
        .collect();

    for server_row in server_updates {
        let mut row = server_row.clone();
        if let Some(RelationshipAction::Update(update)) = actions.get(row.row_id())
            && let Some(kind) = R::relationship_override(update)
        {
            row.set_relationship(kind.clone());
        }
        merged.insert(row.row_id().clone(), row);
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ClientId, DogId, RelationshipId};
    use crate::models::{
        DogToClientRelationship, DogToClientRelationshipKind as Kind, RelationshipUpdate,
    };
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn row(id: &str, kind: Kind) -> DogToClientRelationship {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        DogToClientRelationship {
            id: RelationshipId::from_string(id),
            organization_id: OrganizationId::from_string("org"),
            dog_id: DogId::from_string("dog"),
            client_id: ClientId::from_string(format!("client-{id}")),
            relationship: kind,
            created_at: at,
            updated_at: at,
        }
    }

    fn update(id: &str, kind: Kind) -> RelationshipUpdate<Kind> {
        RelationshipUpdate::new(RelationshipId::from_string(id), kind)
    }

    #[test]
    fn empty_log_partitions_to_nothing() {
        let log = ActionLog::<DogToClientRelationship>::new();
        let partition = separate_actions_log(&log, &OrganizationId::from_string("org"));
        assert!(partition.is_empty());
    }

    #[test]
    fn partition_routes_each_action_and_stamps_inserts() {
        let mut log = ActionLog::new();
        let mut staged = row("a", Kind::Owner);
        staged.organization_id = OrganizationId::from_string("");
        log.stage_insert(staged);
        log.stage_update(update("b", Kind::Walker));
        log.stage_delete(RelationshipId::from_string("c"));

        let tenant = OrganizationId::from_string("tenant-1");
        let partition = log.partition(&tenant);
        assert_eq!(partition.inserts.len(), 1);
        assert_eq!(partition.inserts[0].organization_id, tenant);
        assert_eq!(partition.updates, vec![update("b", Kind::Walker)]);
        assert_eq!(partition.deletes, vec![RelationshipId::from_string("c")]);
    }

    #[test]
    fn delete_over_staged_insert_removes_the_entry() {
        let mut log = ActionLog::new();
        log.stage_insert(row("a", Kind::Owner));
        log.stage_delete(RelationshipId::from_string("a"));
        assert!(log.is_empty());
    }

    #[test]
    fn delete_over_staged_update_becomes_a_delete() {
        let mut log = ActionLog::<DogToClientRelationship>::new();
        log.stage_update(update("a", Kind::Groomer));
        log.stage_delete(RelationshipId::from_string("a"));
        assert_eq!(
            log.get(&RelationshipId::from_string("a")),
            Some(&RelationshipAction::Delete(RelationshipId::from_string("a")))
        );
    }

    #[test]
    fn update_over_staged_insert_stays_an_insert() {
        let mut log = ActionLog::new();
        log.stage_insert(row("a", Kind::Owner));
        log.stage_update(update("a", Kind::EmergencyContact));
        assert_eq!(
            log.get(&RelationshipId::from_string("a")),
            Some(&RelationshipAction::Insert(row("a", Kind::EmergencyContact)))
        );
    }

    #[test]
    fn second_update_overwrites_the_first() {
        let mut log = ActionLog::<DogToClientRelationship>::new();
        log.stage_update(update("a", Kind::Groomer));
        log.stage_update(update("a", Kind::Walker));
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.get(&RelationshipId::from_string("a")),
            Some(&RelationshipAction::Update(update("a", Kind::Walker)))
        );
    }

    #[test]
    fn log_serializes_as_a_map_of_tagged_actions() {
        let mut log = ActionLog::<DogToClientRelationship>::new();
        log.stage_update(update("a", Kind::EmergencyContact));
        log.stage_delete(RelationshipId::from_string("b"));
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "a": { "type": "UPDATE", "payload": { "id": "a", "relationship": "emergency-contact" } },
                "b": { "type": "DELETE", "payload": "b" },
            })
        );
        let back: ActionLog<DogToClientRelationship> = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn merge_keeps_pending_inserts() {
        let mut log = ActionLog::new();
        log.stage_insert(row("new", Kind::Walker));
        let current = vec![row("old", Kind::Owner), row("new", Kind::Walker)];
        let server = vec![row("old", Kind::Owner)];

        let merged = merge_relationships(&current, &server, &log);
        assert_eq!(merged, vec![row("new", Kind::Walker), row("old", Kind::Owner)]);
    }

    #[test]
    fn merge_overrides_only_the_relationship_field() {
        let mut log = ActionLog::new();
        log.stage_update(update("a", Kind::Fosterer));
        let current = vec![row("a", Kind::Fosterer)];
        let mut from_server = row("a", Kind::Owner);
        from_server.client_id = ClientId::from_string("moved");

        let merged = merge_relationships(&current, &[from_server.clone()], &log);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].relationship, Kind::Fosterer);
        assert_eq!(merged[0].client_id, from_server.client_id);
    }

    #[test]
    fn merge_without_actions_takes_the_server_row() {
        let log = ActionLog::new();
        let merged = merge_relationships(&[row("a", Kind::Owner)], &[row("a", Kind::Walker)], &log);
        assert_eq!(merged, vec![row("a", Kind::Walker)]);
    }

    #[test]
    fn merge_of_empty_inputs_is_empty() {
        let log = ActionLog::<DogToClientRelationship>::new();
        assert!(merge_relationships(&[], &[], &log).is_empty());
    }

    fn kind_strategy() -> impl Strategy<Value = Kind> {
        prop::sample::select(Kind::ALL.to_vec())
    }

    #[derive(Debug, Clone)]
    enum Step {
        Insert(u8, Kind),
        Update(u8, Kind),
        Delete(u8),
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u8..8, kind_strategy()).prop_map(|(id, kind)| Step::Insert(id, kind)),
            (0u8..8, kind_strategy()).prop_map(|(id, kind)| Step::Update(id, kind)),
            (0u8..8).prop_map(Step::Delete),
        ]
    }

    proptest! {
        #[test]
        fn partition_accounts_for_every_entry(steps in prop::collection::vec(step_strategy(), 0..40)) {
            let mut log = ActionLog::new();
            for step in steps {
                match step {
                    Step::Insert(id, kind) => log.stage_insert(row(&id.to_string(), kind)),
                    Step::Update(id, kind) => log.stage_update(update(&id.to_string(), kind)),
                    Step::Delete(id) => log.stage_delete(RelationshipId::from_string(id.to_string())),
                }
            }
            let partition = separate_actions_log(&log, &OrganizationId::from_string("org"));
            prop_assert_eq!(partition.len(), log.len());

            for (id, action) in log.iter() {
                let routed = match action {
                    RelationshipAction::Insert(_) => partition.inserts.iter().filter(|r| &r.id == id).count(),
                    RelationshipAction::Update(_) => partition.updates.iter().filter(|u| &u.id == id).count(),
                    RelationshipAction::Delete(_) => partition.deletes.iter().filter(|d| *d == id).count(),
                };
                prop_assert_eq!(routed, 1);
            }
        }

        #[test]
        fn merge_applies_staged_relationship_over_any_server_row(
            local in kind_strategy(),
            staged in kind_strategy(),
            server in kind_strategy(),
        ) {
            let mut log = ActionLog::new();
            log.stage_update(update("a", staged));
            let mut server_row = row("a", server);
            server_row.dog_id = DogId::from_string("server-dog");

            let merged = merge_relationships(&[row("a", local)], &[server_row.clone()], &log);
            prop_assert_eq!(merged.len(), 1);
            prop_assert_eq!(merged[0].relationship, staged);
            server_row.relationship = staged;
            prop_assert_eq!(&merged[0], &server_row);
        }
    }
}
