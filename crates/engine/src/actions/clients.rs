use serde::Serialize;
use tracing::info;

use kennel_core::models::{Client, ClientInput, Dog, DogToClientRelationship};
use kennel_core::{
    ActionLog, ClientId, CurrentUser, PaginationParams, SortableColumns, separate_actions_log,
};
use kennel_storage::{Filter, Record, WriteStorage};

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
        .with("city", &["city"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

const SEARCH_COLUMNS: &[&str] = &["given_name", "family_name", "email_address", "phone_number"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub client: Client,
    pub dogs: Vec<DogToClientRelationship>,
}

impl Engine {
    // ========================================================================
    // Clients
    // ========================================================================

    pub fn list_clients(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<Client>> {
        respond("list clients", || {
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

    pub fn get_client(&self, user: &CurrentUser, id: &ClientId) -> ActionResponse<ClientDetail> {
        respond("get client", || {
            let org = &user.organization_id;
            let client = find_owned(&self.storage, org, "client", id.as_str())?;
            let dogs = rows_for(&self.storage, org, "client_id", id.as_str())?;
            Ok(ClientDetail { client, dogs })
        })
    }

    pub fn insert_client(
        &mut self,
        user: &CurrentUser,
        input: ClientInput,
        dogs: ActionLog<DogToClientRelationship>,
    ) -> ActionResponse<Client> {
        let now = self.now();
        respond("insert client", || {
            validate(&input)?;
            let org = &user.organization_id;
            let client = Client::from_input(input, org.clone(), now);
            let dogs = separate_actions_log(&dogs, org);
            self.storage.transaction(|tx| {
                tx.insert(std::slice::from_ref(&client))?;
                let owner = LogOwner {
                    column: "client_id",
                    id: client.id.as_str(),
                };
                ensure_linked::<_, Dog>(tx, org, &dogs, "dog_id", "dogs")?;
                apply_log(tx, org, &dogs, owner, "dogs", now)
            })?;
            info!(organization_id = %org, client_id = %client.id, dogs = dogs.len(), "client created");
            Ok(client)
        })
    }

    pub fn update_client(
        &mut self,
        user: &CurrentUser,
        input: ClientInput,
        dogs: ActionLog<DogToClientRelationship>,
    ) -> ActionResponse<Client> {
        let now = self.now();
        respond("update client", || {
            validate(&input)?;
            let org = &user.organization_id;
            let dogs = separate_actions_log(&dogs, org);
            let client = self.storage.transaction(|tx| {
                let mut client: Client = find_owned(tx, org, "client", input.id.as_str())?;
                client.apply_input(input, now);
                tx.update::<Client>(&client.changes(), &Filter::tenant(org).id(client.id.as_str()))?;
                let owner = LogOwner {
                    column: "client_id",
                    id: client.id.as_str(),
                };
                ensure_linked::<_, Dog>(tx, org, &dogs, "dog_id", "dogs")?;
                apply_log(tx, org, &dogs, owner, "dogs", now)?;
                Ok::<_, EngineError>(client)
            })?;
            info!(organization_id = %org, client_id = %client.id, dogs = dogs.len(), "client updated");
            Ok(client)
        })
    }

    pub fn delete_client(&mut self, user: &CurrentUser, id: &ClientId) -> ActionResponse<()> {
        respond("delete client", || {
            let org = &user.organization_id;
            let deleted = self
                .storage
                .transaction(|tx| tx.delete::<Client>(&Filter::tenant(org).id(id.as_str())))?;
            if deleted == 0 {
                return Err(EngineError::not_found("client", id));
            }
            info!(organization_id = %org, client_id = %id, "client deleted");
            Ok(())
        })
    }
}
