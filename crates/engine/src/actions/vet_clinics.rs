use serde::Serialize;
use tracing::info;

use kennel_core::models::{Vet, VetClinic, VetClinicInput, VetToVetClinicRelationship};
use kennel_core::{
    ActionLog, CurrentUser, PaginationParams, SortableColumns, VetClinicId, separate_actions_log,
};
use kennel_storage::{Filter, Record, WriteStorage};

use super::{
    LogOwner, Paginated, apply_log, ensure_linked, find_owned, list_page, rows_for, validate,
};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

fn sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("name", &["name"])
        .with("emailAddress", &["email_address"])
        .with("phoneNumber", &["phone_number"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

const SEARCH_COLUMNS: &[&str] = &["name", "email_address", "phone_number"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VetClinicDetail {
    pub vet_clinic: VetClinic,
    pub vets: Vec<VetToVetClinicRelationship>,
}

impl Engine {
    // ========================================================================
    // Vet clinics
    // ========================================================================

    pub fn list_vet_clinics(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<VetClinic>> {
        respond("list vet clinics", || {
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

    pub fn get_vet_clinic(
        &self,
        user: &CurrentUser,
        id: &VetClinicId,
    ) -> ActionResponse<VetClinicDetail> {
        respond("get vet clinic", || {
            let org = &user.organization_id;
            Ok(VetClinicDetail {
                vet_clinic: find_owned(&self.storage, org, "vet clinic", id.as_str())?,
                vets: rows_for(&self.storage, org, "vet_clinic_id", id.as_str())?,
            })
        })
    }

    pub fn insert_vet_clinic(
        &mut self,
        user: &CurrentUser,
        input: VetClinicInput,
        vets: ActionLog<VetToVetClinicRelationship>,
    ) -> ActionResponse<VetClinic> {
        let now = self.now();
        respond("insert vet clinic", || {
            validate(&input)?;
            let org = &user.organization_id;
            let clinic = VetClinic::from_input(input, org.clone(), now);
            let vets = separate_actions_log(&vets, org);
            self.storage.transaction(|tx| {
                tx.insert(std::slice::from_ref(&clinic))?;
                let owner = LogOwner {
                    column: "vet_clinic_id",
                    id: clinic.id.as_str(),
                };
                ensure_linked::<_, Vet>(tx, org, &vets, "vet_id", "vets")?;
                apply_log(tx, org, &vets, owner, "vets", now)
            })?;
            info!(organization_id = %org, vet_clinic_id = %clinic.id, "vet clinic created");
            Ok(clinic)
        })
    }

    pub fn update_vet_clinic(
        &mut self,
        user: &CurrentUser,
        input: VetClinicInput,
        vets: ActionLog<VetToVetClinicRelationship>,
    ) -> ActionResponse<VetClinic> {
        let now = self.now();
        respond("update vet clinic", || {
            validate(&input)?;
            let org = &user.organization_id;
            let vets = separate_actions_log(&vets, org);
            let clinic = self.storage.transaction(|tx| {
                let mut clinic: VetClinic = find_owned(tx, org, "vet clinic", input.id.as_str())?;
                clinic.apply_input(input, now);
                tx.update::<VetClinic>(
                    &clinic.changes(),
                    &Filter::tenant(org).id(clinic.id.as_str()),
                )?;
                let owner = LogOwner {
                    column: "vet_clinic_id",
                    id: clinic.id.as_str(),
                };
                ensure_linked::<_, Vet>(tx, org, &vets, "vet_id", "vets")?;
                apply_log(tx, org, &vets, owner, "vets", now)?;
                Ok::<_, EngineError>(clinic)
            })?;
            info!(organization_id = %org, vet_clinic_id = %clinic.id, "vet clinic updated");
            Ok(clinic)
        })
    }

    pub fn delete_vet_clinic(
        &mut self,
        user: &CurrentUser,
        id: &VetClinicId,
    ) -> ActionResponse<()> {
        respond("delete vet clinic", || {
            let org = &user.organization_id;
            let deleted = self
                .storage
                .transaction(|tx| tx.delete::<VetClinic>(&Filter::tenant(org).id(id.as_str())))?;
            if deleted == 0 {
                return Err(EngineError::not_found("vet clinic", id));
            }
            info!(organization_id = %org, vet_clinic_id = %id, "vet clinic deleted");
            Ok(())
        })
    }
}
