//! Sign-up and opaque session tokens.
//!
//! A token is 32 random bytes, hex encoded, handed to the client once. The
//! `sessions` table only stores its BLAKE3 hash, so a leaked database does
//! not leak usable tokens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use kennel_core::models::{AuthSession, Organization, OrganizationRole, SignUpInput, User};
use kennel_core::models::organization::DEFAULT_MAX_USERS;
use kennel_core::{CurrentUser, OrganizationId, UserId};
use kennel_storage::record::timestamp;
use kennel_storage::{Changeset, Filter, FindMany, ReadStorage, StorageTx, WriteStorage};

use super::{expires_after, validate};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    pub user: CurrentUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(super) fn issue_session(
    tx: &StorageTx<'_>,
    user: &User,
    ttl_days: i64,
    now: DateTime<Utc>,
) -> Result<SignedIn, EngineError> {
    let token = generate_token();
    let session = AuthSession {
        id: hash_token(&token),
        user_id: user.id.clone(),
        expires_at: expires_after(now, ttl_days, "session_ttl_days")?,
    };
    tx.insert(std::slice::from_ref(&session))?;
    Ok(SignedIn {
        user: CurrentUser::from(user),
        token,
        expires_at: session.expires_at,
    })
}

pub(super) fn email_in_use(
    storage: &impl ReadStorage,
    email_address: &str,
) -> Result<bool, EngineError> {
    let filter = Filter::all().eq("email_address", email_address.to_string());
    Ok(storage.count::<User>(&filter)? > 0)
}

impl Engine {
    // ========================================================================
    // Sign-up and sessions
    // ========================================================================

    /// Create an organization with the signing-up user as its owner, and
    /// sign them in.
    pub fn create_organization_with_owner(
        &mut self,
        input: SignUpInput,
    ) -> ActionResponse<SignedIn> {
        let now = self.now();
        let ttl = self.config.session_ttl_days;
        respond("create organization", || {
            validate(&input)?;
            let email_address = input.email_address.trim().to_lowercase();
            let signed_in = self.storage.transaction(|tx| {
                if email_in_use(tx, &email_address)? {
                    return Err(EngineError::invalid(
                        "emailAddress",
                        "Email address is already in use",
                    ));
                }
                let organization = Organization {
                    id: OrganizationId::new(),
                    name: input.organization_name.trim().to_string(),
                    email_address: Some(email_address.clone()),
                    max_users: DEFAULT_MAX_USERS,
                    created_at: now,
                    updated_at: now,
                };
                let owner = User {
                    id: UserId::new(),
                    organization_id: organization.id.clone(),
                    organization_role: OrganizationRole::Owner,
                    given_name: input.given_name.trim().to_string(),
                    family_name: input.family_name.trim().to_string(),
                    email_address,
                    email_verified: false,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert(std::slice::from_ref(&organization))?;
                tx.insert(std::slice::from_ref(&owner))?;
                issue_session(tx, &owner, ttl, now)
            })?;
            info!(
                organization_id = %signed_in.user.organization_id,
                user_id = %signed_in.user.user_id,
                "organization created"
            );
            Ok(signed_in)
        })
    }

    /// Issue a new session for an existing user.
    pub fn create_session(&mut self, user_id: &UserId) -> ActionResponse<SignedIn> {
        let now = self.now();
        let ttl = self.config.session_ttl_days;
        respond("create session", || {
            let signed_in = self.storage.transaction(|tx| {
                let user = tx
                    .find_first::<User>(&FindMany::new(Filter::all().id(user_id.as_str())))?
                    .ok_or_else(|| EngineError::not_found("user", user_id))?;
                issue_session(tx, &user, ttl, now)
            })?;
            info!(user_id = %user_id, "session created");
            Ok(signed_in)
        })
    }

    /// Resolve a token to the user it was issued to. Expired sessions are
    /// deleted; sessions in the second half of their lifetime are extended.
    pub fn validate_session_token(&mut self, token: &str) -> ActionResponse<CurrentUser> {
        let now = self.now();
        let ttl_days = self.config.session_ttl_days;
        respond("validate session", || {
            let extended = expires_after(now, ttl_days, "session_ttl_days")?;
            let ttl = extended - now;
            let session_id = hash_token(token);
            let by_id = Filter::all().id(&session_id);
            let current = self.storage.transaction(|tx| {
                let Some(session) =
                    tx.find_first::<AuthSession>(&FindMany::new(by_id.clone()))?
                else {
                    return Err(EngineError::Unauthenticated);
                };
                if session.expires_at <= now {
                    tx.delete::<AuthSession>(&by_id)?;
                    return Ok(None);
                }
                if session.expires_at - now < ttl / 2 {
                    let changes = Changeset::new().set("expires_at", timestamp(extended));
                    tx.update::<AuthSession>(&changes, &by_id)?;
                }
                let user = tx
                    .find_first::<User>(&FindMany::new(Filter::all().id(session.user_id.as_str())))?
                    .ok_or(EngineError::Unauthenticated)?;
                Ok(Some(CurrentUser::from(&user)))
            })?;
            // The expired row is gone by now; report after the commit.
            current.ok_or_else(|| {
                warn!("expired session rejected");
                EngineError::Unauthenticated
            })
        })
    }

    pub fn invalidate_session(&mut self, token: &str) -> ActionResponse<()> {
        respond("invalidate session", || {
            let session_id = hash_token(token);
            self.storage
                .transaction(|tx| tx.delete::<AuthSession>(&Filter::all().id(&session_id)))?;
            Ok(())
        })
    }
}
