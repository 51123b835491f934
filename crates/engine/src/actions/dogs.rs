use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use kennel_core::models::{
    Client, Dog, DogInput, DogSession, DogToClientRelationship, DogToVetRelationship, Vet,
};
use kennel_core::validation::Issues;
use kennel_core::{
    ActionLog, CurrentUser, CursorPage, DogId, PaginationParams, RelationshipAction, SeekKey,
    SortDirection, SortableColumns, Validate, separate_actions_log,
};
use kennel_storage::{Filter, Record, StorageTx, WriteStorage};

use super::{
    LogOwner, Paginated, apply_log, cursor_page, ensure_linked, find_owned, list_page, rows_for,
    validate,
};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

const DOG_SESSION_KEY: SeekKey = SeekKey {
    column: "date",
    id_column: "id",
    direction: SortDirection::Desc,
};

fn sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("givenName", &["given_name"])
        .with("breed", &["breed"])
        .with("color", &["color"])
        .with("sex", &["sex"])
        .with("dateOfBirth", &["date_of_birth"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

const SEARCH_COLUMNS: &[&str] = &["given_name", "breed", "color"];

/// Staged edits submitted together with the dog form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DogRelationshipLogs {
    pub clients: ActionLog<DogToClientRelationship>,
    pub vets: ActionLog<DogToVetRelationship>,
    pub sessions: ActionLog<DogSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DogDetail {
    pub dog: Dog,
    pub clients: Vec<DogToClientRelationship>,
    pub vets: Vec<DogToVetRelationship>,
    pub sessions: CursorPage<DogSession>,
}

impl Engine {
    // ========================================================================
    // Dogs
    // ========================================================================

    pub fn list_dogs(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<Dog>> {
        respond("list dogs", || {
            let filter =
                Filter::tenant(&user.organization_id).search(SEARCH_COLUMNS, params.search_term());
            list_page(
                &self.storage,
                filter,
                params,
                &sortable_columns(),
                self.config.default_page_size,
            )
        })
    }

    /// The dog with its join rows and the first page of its session history.
    pub fn get_dog(&self, user: &CurrentUser, id: &DogId) -> ActionResponse<DogDetail> {
        respond("get dog", || {
            let org = &user.organization_id;
            let dog: Dog = find_owned(&self.storage, org, "dog", id.as_str())?;
            let clients = rows_for(&self.storage, org, "dog_id", id.as_str())?;
            let vets = rows_for(&self.storage, org, "dog_id", id.as_str())?;
            let sessions = self.dog_session_page(user, id, None)?;
            Ok(DogDetail {
                dog,
                clients,
                vets,
                sessions,
            })
        })
    }

    /// Sessions newest first, `sessions_page_size` at a time.
    pub fn list_dog_sessions(
        &self,
        user: &CurrentUser,
        dog_id: &DogId,
        cursor: Option<&str>,
    ) -> ActionResponse<CursorPage<DogSession>> {
        respond("list dog sessions", || {
            self.dog_session_page(user, dog_id, cursor)
        })
    }

    fn dog_session_page(
        &self,
        user: &CurrentUser,
        dog_id: &DogId,
        cursor: Option<&str>,
    ) -> Result<CursorPage<DogSession>, EngineError> {
        let filter = Filter::tenant(&user.organization_id).eq("dog_id", dog_id.as_str().to_string());
        cursor_page(
            &self.storage,
            filter,
            &DOG_SESSION_KEY,
            cursor,
            self.config.sessions_page_size,
        )
    }

    pub fn insert_dog(
        &mut self,
        user: &CurrentUser,
        input: DogInput,
        logs: DogRelationshipLogs,
    ) -> ActionResponse<Dog> {
        let now = self.now();
        respond("insert dog", || {
            validate(&input)?;
            validate_sessions(&logs)?;
            let dog = Dog::from_input(input, user.organization_id.clone(), now);
            self.storage.transaction(|tx| {
                tx.insert(std::slice::from_ref(&dog))?;
                write_dog_logs(tx, user, &dog.id, &logs, now)
            })?;
            info!(organization_id = %user.organization_id, dog_id = %dog.id, "dog created");
            Ok(dog)
        })
    }

    pub fn update_dog(
        &mut self,
        user: &CurrentUser,
        input: DogInput,
        logs: DogRelationshipLogs,
    ) -> ActionResponse<Dog> {
        let now = self.now();
        respond("update dog", || {
            validate(&input)?;
            validate_sessions(&logs)?;
            let org = &user.organization_id;
            let dog = self.storage.transaction(|tx| {
                let mut dog: Dog = find_owned(tx, org, "dog", input.id.as_str())?;
                dog.apply_input(input, now);
                tx.update::<Dog>(&dog.changes(), &Filter::tenant(org).id(dog.id.as_str()))?;
                write_dog_logs(tx, user, &dog.id, &logs, now)?;
                Ok::<_, EngineError>(dog)
            })?;
            info!(organization_id = %org, dog_id = %dog.id, "dog updated");
            Ok(dog)
        })
    }

    /// Join rows and sessions go with the dog; bookings keep their history
    /// with the dog cleared.
    pub fn delete_dog(&mut self, user: &CurrentUser, id: &DogId) -> ActionResponse<()> {
        respond("delete dog", || {
            let org = &user.organization_id;
            let deleted = self
                .storage
                .transaction(|tx| tx.delete::<Dog>(&Filter::tenant(org).id(id.as_str())))?;
            if deleted == 0 {
                return Err(EngineError::not_found("dog", id));
            }
            info!(organization_id = %org, dog_id = %id, "dog deleted");
            Ok(())
        })
    }
}

fn validate_sessions(logs: &DogRelationshipLogs) -> Result<(), EngineError> {
    let mut issues = Issues::new();
    for (_, action) in logs.sessions.iter() {
        match action {
            RelationshipAction::Insert(session) => {
                issues.nested("sessions", session.validate());
            }
            RelationshipAction::Update(update) => {
                issues.nested("sessions", update.validate());
            }
            RelationshipAction::Delete(_) => {}
        }
    }
    issues.finish().map_err(EngineError::Validation)
}

fn write_dog_logs(
    tx: &StorageTx<'_>,
    user: &CurrentUser,
    dog_id: &DogId,
    logs: &DogRelationshipLogs,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let org = &user.organization_id;
    let owner = LogOwner {
        column: "dog_id",
        id: dog_id.as_str(),
    };

    let clients = separate_actions_log(&logs.clients, org);
    ensure_linked::<_, Client>(tx, org, &clients, "client_id", "clients")?;
    apply_log(tx, org, &clients, owner, "clients", now)?;

    let vets = separate_actions_log(&logs.vets, org);
    ensure_linked::<_, Vet>(tx, org, &vets, "vet_id", "vets")?;
    apply_log(tx, org, &vets, owner, "vets", now)?;

    let sessions = separate_actions_log(&logs.sessions, org);
    apply_log(tx, org, &sessions, owner, "sessions", now)?;

    if !(clients.is_empty() && vets.is_empty() && sessions.is_empty()) {
        info!(
            organization_id = %org,
            dog_id = %dog_id,
            clients = clients.len(),
            vets = vets.len(),
            sessions = sessions.len(),
            "dog relationships saved"
        );
    }
    Ok(())
}
