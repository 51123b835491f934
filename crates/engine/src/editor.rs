use kennel_core::{ActionLog, Relationship, RelationshipAction, merge_relationships};

/// Client-side editing state for one entity's join rows.
///
/// Holds the rows the form shows plus the staged edits that have not been
/// saved yet. Submit with [`RelationshipEditor::log`] and call
/// [`RelationshipEditor::mark_saved`] once the update action succeeds; on
/// failure the staged edits stay put so the user can retry.
#[derive(Debug, Clone)]
pub struct RelationshipEditor<R: Relationship> {
    rows: Vec<R>,
    log: ActionLog<R>,
}

impl<R: Relationship> Default for RelationshipEditor<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: Relationship> RelationshipEditor<R> {
    pub fn new(mut rows: Vec<R>) -> Self {
        rows.sort_by(|a, b| a.row_id().cmp(b.row_id()));
        Self {
            rows,
            log: ActionLog::new(),
        }
    }

    /// Visible rows, ordered by id.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn log(&self) -> &ActionLog<R> {
        &self.log
    }

    pub fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn insert(&mut self, row: R) {
        let id = row.row_id().clone();
        match self.rows.binary_search_by(|r| r.row_id().cmp(&id)) {
            Ok(idx) => self.rows[idx] = row.clone(),
            Err(idx) => self.rows.insert(idx, row.clone()),
        }
        self.log.stage_insert(row);
    }

    /// Returns `false` when no visible row has `id`.
    pub fn update_kind(&mut self, id: &R::Id, kind: R::Kind) -> bool {
        let Some(row) = self.rows.iter_mut().find(|r| r.row_id() == id) else {
            return false;
        };
        let update = R::kind_update(id.clone(), kind);
        row.apply_update(&update);
        self.log.stage_update(update);
        true
    }

    pub fn remove(&mut self, id: &R::Id) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.row_id() != id);
        if self.rows.len() == before {
            return false;
        }
        self.log.stage_delete(id.clone());
        true
    }

    /// Fold a fresh server snapshot in without losing staged edits. Rows
    /// with a staged delete stay hidden.
    pub fn refresh(&mut self, server_rows: &[R]) {
        let mut rows = merge_relationships(&self.rows, server_rows, &self.log);
        rows.retain(|r| !matches!(self.log.get(r.row_id()), Some(RelationshipAction::Delete(_))));
        self.rows = rows;
    }

    /// Hand the staged edits over, leaving the log empty.
    pub fn take_log(&mut self) -> ActionLog<R> {
        std::mem::take(&mut self.log)
    }

    /// The staged edits were persisted; `server_rows` is the saved state.
    pub fn mark_saved(&mut self, server_rows: Vec<R>) {
        *self = Self::new(server_rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_core::models::{DogToClientRelationship, DogToClientRelationshipKind as Kind};
    use kennel_core::{ClientId, DogId};

    fn rel(dog: &DogId, kind: Kind) -> DogToClientRelationship {
        DogToClientRelationship::new(dog.clone(), ClientId::new(), kind, Utc::now())
    }

    #[test]
    fn staged_insert_then_remove_leaves_nothing() {
        let dog = DogId::new();
        let mut editor = RelationshipEditor::default();
        let row = rel(&dog, Kind::Owner);
        let id = row.id.clone();

        editor.insert(row);
        assert_eq!(editor.rows().len(), 1);
        assert!(editor.remove(&id));
        assert!(editor.rows().is_empty());
        assert!(!editor.has_changes());
    }

    #[test]
    fn update_kind_changes_the_visible_row_and_stages_an_update() {
        let dog = DogId::new();
        let existing = rel(&dog, Kind::Owner);
        let id = existing.id.clone();
        let mut editor = RelationshipEditor::new(vec![existing]);

        assert!(editor.update_kind(&id, Kind::Walker));
        assert_eq!(editor.rows()[0].relationship, Kind::Walker);
        assert!(matches!(editor.log().get(&id), Some(RelationshipAction::Update(_))));
        assert!(!editor.update_kind(&kennel_core::RelationshipId::new(), Kind::Other));
    }

    #[test]
    fn refresh_keeps_unsaved_work() {
        let dog = DogId::new();
        let saved = rel(&dog, Kind::Owner);
        let id = saved.id.clone();
        let mut editor = RelationshipEditor::new(vec![saved.clone()]);
        editor.update_kind(&id, Kind::Groomer);
        let pending = rel(&dog, Kind::Fosterer);
        editor.insert(pending.clone());

        let mut server = saved.clone();
        server.updated_at = Utc::now();
        editor.refresh(&[server]);

        assert_eq!(editor.rows().len(), 2);
        let refreshed = editor.rows().iter().find(|r| r.id == id).unwrap();
        assert_eq!(refreshed.relationship, Kind::Groomer);
        assert!(editor.rows().iter().any(|r| r.id == pending.id));
    }

    #[test]
    fn refresh_keeps_removed_rows_hidden() {
        let dog = DogId::new();
        let saved = rel(&dog, Kind::Owner);
        let id = saved.id.clone();
        let mut editor = RelationshipEditor::new(vec![saved.clone()]);
        assert!(editor.remove(&id));

        editor.refresh(&[saved]);

        assert!(editor.rows().is_empty());
        assert!(!editor.update_kind(&id, Kind::Walker));
        assert!(matches!(editor.log().get(&id), Some(RelationshipAction::Delete(_))));
        assert_eq!(editor.log().len(), 1);
    }

    #[test]
    fn mark_saved_replaces_rows_and_clears_the_log() {
        let dog = DogId::new();
        let mut editor = RelationshipEditor::default();
        let row = rel(&dog, Kind::Owner);
        editor.insert(row.clone());

        let submitted = editor.log().clone();
        assert_eq!(submitted.len(), 1);
        editor.mark_saved(vec![row]);
        assert!(!editor.has_changes());
        assert_eq!(editor.rows().len(), 1);
    }
}
