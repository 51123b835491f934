use tracing::info;

use kennel_core::models::{Organization, OrganizationInput, OrganizationRole, User};
use kennel_core::{CurrentUser, PaginationParams, SortableColumns, UserId};
use kennel_storage::record::{string_enum, timestamp};
use kennel_storage::{Changeset, Filter, FindMany, ReadStorage, Record, WriteStorage};

use super::{Paginated, find_owned, list_page, require_manager, require_owner, validate};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

fn user_sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("givenName", &["given_name"])
        .with("familyName", &["family_name"])
        .with("fullName", &["given_name", "family_name"])
        .with("emailAddress", &["email_address"])
        .with("organizationRole", &["organization_role"])
        .with("createdAt", &["created_at"])
}

const USER_SEARCH_COLUMNS: &[&str] = &["given_name", "family_name", "email_address"];

impl Engine {
    // ========================================================================
    // Organization and members
    // ========================================================================

    pub fn get_organization(&self, user: &CurrentUser) -> ActionResponse<Organization> {
        respond("get organization", || {
            let filter = Filter::all().id(user.organization_id.as_str());
            self.storage
                .find_first::<Organization>(&FindMany::new(filter))?
                .ok_or_else(|| EngineError::not_found("organization", &user.organization_id))
        })
    }

    pub fn update_organization(
        &mut self,
        user: &CurrentUser,
        input: OrganizationInput,
    ) -> ActionResponse<Organization> {
        let now = self.now();
        respond("update organization", || {
            require_manager(user, "update the organization")?;
            validate(&input)?;
            let filter = Filter::all().id(user.organization_id.as_str());
            let organization = self.storage.transaction(|tx| {
                let mut organization = tx
                    .find_first::<Organization>(&FindMany::new(filter.clone()))?
                    .ok_or_else(|| EngineError::not_found("organization", &user.organization_id))?;
                organization.name = input.name.trim().to_string();
                organization.email_address = input.email_address.filter(|e| !e.is_empty());
                organization.updated_at = now;
                tx.update::<Organization>(&organization.changes(), &filter)?;
                Ok::<_, EngineError>(organization)
            })?;
            info!(organization_id = %organization.id, "organization updated");
            Ok(organization)
        })
    }

    pub fn list_users(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<User>> {
        respond("list users", || {
            let filter = Filter::tenant(&user.organization_id)
                .search(USER_SEARCH_COLUMNS, params.search_term());
            list_page(
                &self.storage,
                filter,
                params,
                &user_sortable_columns(),
                self.config.default_page_size,
            )
        })
    }

    /// Only the owner changes roles, and ownership cannot be handed out here.
    pub fn update_user_role(
        &mut self,
        user: &CurrentUser,
        user_id: &UserId,
        role: OrganizationRole,
    ) -> ActionResponse<User> {
        let now = self.now();
        respond("update user role", || {
            require_owner(user, "change member roles")?;
            if role == OrganizationRole::Owner {
                return Err(EngineError::invalid(
                    "organizationRole",
                    "Ownership cannot be assigned",
                ));
            }
            if *user_id == user.user_id {
                return Err(EngineError::invalid(
                    "organizationRole",
                    "You cannot change your own role",
                ));
            }
            let org = &user.organization_id;
            let member = self.storage.transaction(|tx| {
                let mut member: User = find_owned(tx, org, "user", user_id.as_str())?;
                member.organization_role = role;
                member.updated_at = now;
                let changes = Changeset::new()
                    .set("organization_role", string_enum(role))
                    .set("updated_at", timestamp(now));
                tx.update::<User>(&changes, &Filter::tenant(org).id(user_id.as_str()))?;
                Ok::<_, EngineError>(member)
            })?;
            info!(organization_id = %org, user_id = %user_id, role = %role, "user role changed");
            Ok(member)
        })
    }

    /// Owners and admins remove members; the owner can never be removed.
    pub fn remove_user(&mut self, user: &CurrentUser, user_id: &UserId) -> ActionResponse<()> {
        respond("remove user", || {
            require_manager(user, "remove members")?;
            let org = &user.organization_id;
            self.storage.transaction(|tx| {
                let member: User = find_owned(tx, org, "user", user_id.as_str())?;
                if member.organization_role == OrganizationRole::Owner {
                    return Err(EngineError::Forbidden(
                        "The organization owner cannot be removed".into(),
                    ));
                }
                tx.delete::<User>(&Filter::tenant(org).id(user_id.as_str()))?;
                Ok(())
            })?;
            info!(organization_id = %org, user_id = %user_id, "user removed");
            Ok(())
        })
    }
}
