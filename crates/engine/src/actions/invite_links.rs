use tracing::{info, warn};

use kennel_core::models::{
    AcceptInviteInput, InviteLinkInput, Organization, OrganizationInviteLink, User,
};
use kennel_core::{CurrentUser, InviteLinkId, OrderByColumn, SortDirection, UserId};
use kennel_storage::record::timestamp;
use kennel_storage::{Changeset, Filter, FindMany, ReadStorage, WriteStorage};

use super::auth::{SignedIn, email_in_use, issue_session};
use super::{expires_after, require_manager, validate};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

impl Engine {
    // ========================================================================
    // Invite links
    // ========================================================================

    pub fn create_invite_link(
        &mut self,
        user: &CurrentUser,
        input: InviteLinkInput,
    ) -> ActionResponse<OrganizationInviteLink> {
        let now = self.now();
        let ttl_days = self.config.invite_link_ttl_days;
        respond("create invite link", || {
            require_manager(user, "create invite links")?;
            validate(&input)?;
            let expires_at = expires_after(now, ttl_days, "invite_link_ttl_days")?;
            let link = OrganizationInviteLink {
                id: InviteLinkId::new(),
                organization_id: user.organization_id.clone(),
                user_id: user.user_id.clone(),
                organization_role: input.organization_role,
                uses: 0,
                max_uses: input.max_uses,
                expires_at,
                created_at: now,
                updated_at: now,
            };
            self.storage
                .transaction(|tx| tx.insert(std::slice::from_ref(&link)))?;
            info!(
                organization_id = %link.organization_id,
                invite_link_id = %link.id,
                role = %link.organization_role,
                "invite link created"
            );
            Ok(link)
        })
    }

    /// Newest first.
    pub fn list_invite_links(
        &self,
        user: &CurrentUser,
    ) -> ActionResponse<Vec<OrganizationInviteLink>> {
        respond("list invite links", || {
            let query = FindMany::new(Filter::tenant(&user.organization_id)).order_by(vec![
                OrderByColumn::new("created_at", SortDirection::Desc),
                OrderByColumn::new("id", SortDirection::Asc),
            ]);
            Ok(self.storage.find_many(&query)?)
        })
    }

    pub fn delete_invite_link(
        &mut self,
        user: &CurrentUser,
        id: &InviteLinkId,
    ) -> ActionResponse<()> {
        respond("delete invite link", || {
            require_manager(user, "delete invite links")?;
            let org = &user.organization_id;
            let deleted = self.storage.transaction(|tx| {
                tx.delete::<OrganizationInviteLink>(&Filter::tenant(org).id(id.as_str()))
            })?;
            if deleted == 0 {
                return Err(EngineError::not_found("invite link", id));
            }
            info!(organization_id = %org, invite_link_id = %id, "invite link deleted");
            Ok(())
        })
    }

    /// Join the link's organization with the link's role and sign in. The
    /// link must be unexpired, under its use limit, and the organization
    /// under its seat limit.
    pub fn accept_invite_link(
        &mut self,
        id: &InviteLinkId,
        input: AcceptInviteInput,
    ) -> ActionResponse<SignedIn> {
        let now = self.now();
        let ttl = self.config.session_ttl_days;
        respond("accept invite link", || {
            validate(&input)?;
            let email_address = input.email_address.trim().to_lowercase();
            let by_id = Filter::all().id(id.as_str());
            let signed_in = self.storage.transaction(|tx| {
                let link = tx
                    .find_first::<OrganizationInviteLink>(&FindMany::new(by_id.clone()))?
                    .ok_or_else(|| EngineError::not_found("invite link", id))?;
                if !link.is_usable(now) {
                    warn!(invite_link_id = %id, uses = link.uses, "unusable invite link");
                    return Err(EngineError::Rejected(
                        "This invite link has expired or reached its usage limit".into(),
                    ));
                }

                let org = &link.organization_id;
                let organization = tx
                    .find_first::<Organization>(&FindMany::new(Filter::all().id(org.as_str())))?
                    .ok_or_else(|| EngineError::not_found("organization", org))?;
                let members = tx.count::<User>(&Filter::tenant(org))?;
                if members >= u64::try_from(organization.max_users).unwrap_or_default() {
                    return Err(EngineError::Rejected(
                        "This organization has no seats left".into(),
                    ));
                }
                if email_in_use(tx, &email_address)? {
                    return Err(EngineError::invalid(
                        "emailAddress",
                        "Email address is already in use",
                    ));
                }

                let member = User {
                    id: UserId::new(),
                    organization_id: org.clone(),
                    organization_role: link.organization_role,
                    given_name: input.given_name.trim().to_string(),
                    family_name: input.family_name.trim().to_string(),
                    email_address,
                    email_verified: false,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert(std::slice::from_ref(&member))?;
                let changes = Changeset::new()
                    .set("uses", link.uses + 1)
                    .set("updated_at", timestamp(now));
                tx.update::<OrganizationInviteLink>(&changes, &by_id)?;
                issue_session(tx, &member, ttl, now)
            })?;
            info!(
                organization_id = %signed_in.user.organization_id,
                user_id = %signed_in.user.user_id,
                invite_link_id = %id,
                "invite link accepted"
            );
            Ok(signed_in)
        })
    }
}
