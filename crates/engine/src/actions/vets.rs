use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use kennel_core::models::{
    Dog, DogToVetRelationship, Vet, VetClinic, VetInput, VetToVetClinicRelationship,
};
use kennel_core::{
    ActionLog, CurrentUser, PaginationParams, SortableColumns, VetId, separate_actions_log,
};
use kennel_storage::{Filter, Record, StorageTx, WriteStorage};

use super::{
    LogOwner, Paginated, apply_log, ensure_linked, find_owned, list_page, rows_for, validate,
};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

fn sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("givenName", &["given_name"])
        .with("familyName", &["family_name"])
        .with("fullName", &["given_name", "family_name"])
        .with("emailAddress", &["email_address"])
        .with("phoneNumber", &["phone_number"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

const SEARCH_COLUMNS: &[&str] = &["given_name", "family_name", "email_address", "phone_number"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VetRelationshipLogs {
    pub dogs: ActionLog<DogToVetRelationship>,
    pub vet_clinics: ActionLog<VetToVetClinicRelationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VetDetail {
    pub vet: Vet,
    pub dogs: Vec<DogToVetRelationship>,
    pub vet_clinics: Vec<VetToVetClinicRelationship>,
}

impl Engine {
    // ========================================================================
    // Vets
    // ========================================================================

    pub fn list_vets(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<Vet>> {
        respond("list vets", || {
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

    pub fn get_vet(&self, user: &CurrentUser, id: &VetId) -> ActionResponse<VetDetail> {
        respond("get vet", || {
            let org = &user.organization_id;
            Ok(VetDetail {
                vet: find_owned(&self.storage, org, "vet", id.as_str())?,
                dogs: rows_for(&self.storage, org, "vet_id", id.as_str())?,
                vet_clinics: rows_for(&self.storage, org, "vet_id", id.as_str())?,
            })
        })
    }

    pub fn insert_vet(
        &mut self,
        user: &CurrentUser,
        input: VetInput,
        logs: VetRelationshipLogs,
    ) -> ActionResponse<Vet> {
        let now = self.now();
        respond("insert vet", || {
            validate(&input)?;
            let vet = Vet::from_input(input, user.organization_id.clone(), now);
            self.storage.transaction(|tx| {
                tx.insert(std::slice::from_ref(&vet))?;
                write_vet_logs(tx, user, &vet.id, &logs, now)
            })?;
            info!(organization_id = %user.organization_id, vet_id = %vet.id, "vet created");
            Ok(vet)
        })
    }

    pub fn update_vet(
        &mut self,
        user: &CurrentUser,
        input: VetInput,
        logs: VetRelationshipLogs,
    ) -> ActionResponse<Vet> {
        let now = self.now();
        respond("update vet", || {
            validate(&input)?;
            let org = &user.organization_id;
            let vet = self.storage.transaction(|tx| {
                let mut vet: Vet = find_owned(tx, org, "vet", input.id.as_str())?;
                vet.apply_input(input, now);
                tx.update::<Vet>(&vet.changes(), &Filter::tenant(org).id(vet.id.as_str()))?;
                write_vet_logs(tx, user, &vet.id, &logs, now)?;
                Ok::<_, EngineError>(vet)
            })?;
            info!(organization_id = %org, vet_id = %vet.id, "vet updated");
            Ok(vet)
        })
    }

    pub fn delete_vet(&mut self, user: &CurrentUser, id: &VetId) -> ActionResponse<()> {
        respond("delete vet", || {
            let org = &user.organization_id;
            let deleted = self
                .storage
                .transaction(|tx| tx.delete::<Vet>(&Filter::tenant(org).id(id.as_str())))?;
            if deleted == 0 {
                return Err(EngineError::not_found("vet", id));
            }
            info!(organization_id = %org, vet_id = %id, "vet deleted");
            Ok(())
        })
    }
}

fn write_vet_logs(
    tx: &StorageTx<'_>,
    user: &CurrentUser,
    vet_id: &VetId,
    logs: &VetRelationshipLogs,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let org = &user.organization_id;
    let owner = LogOwner {
        column: "vet_id",
        id: vet_id.as_str(),
    };

    let dogs = separate_actions_log(&logs.dogs, org);
    ensure_linked::<_, Dog>(tx, org, &dogs, "dog_id", "dogs")?;
    apply_log(tx, org, &dogs, owner, "dogs", now)?;

    let clinics = separate_actions_log(&logs.vet_clinics, org);
    ensure_linked::<_, VetClinic>(tx, org, &clinics, "vet_clinic_id", "vetClinics")?;
    apply_log(tx, org, &clinics, owner, "vetClinics", now)?;
    Ok(())
}
