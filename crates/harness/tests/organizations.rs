use chrono::{Duration, Utc};

use kennel_core::models::{
    AuthSession, InviteLinkInput, Organization, OrganizationInput, OrganizationInviteLink,
    OrganizationRole,
};
use kennel_core::{InviteLinkId, PaginationParams};
use kennel_engine::{ActionResponse, EngineConfig};
use kennel_harness::{TestClinic, TestResult, fixtures};
use kennel_storage::record::timestamp;
use kennel_storage::{Changeset, Filter, FindMany, ReadStorage, WriteStorage};

fn invite(
    clinic: &mut TestClinic,
    role: OrganizationRole,
    max_uses: Option<i64>,
) -> TestResult<OrganizationInviteLink> {
    let link = clinic
        .engine
        .create_invite_link(
            &clinic.owner,
            InviteLinkInput {
                organization_role: role,
                max_uses,
            },
        )
        .into_result()?;
    Ok(link)
}

// ============================================================================
// Sign-up
// ============================================================================

#[test]
fn sign_up_creates_an_owned_organization() -> TestResult {
    let clinic = TestClinic::new()?;
    assert_eq!(clinic.owner.organization_role, OrganizationRole::Owner);
    assert_eq!(clinic.owner.email_address, "olive@happypaws.test");

    let organization = clinic.engine.get_organization(&clinic.owner).into_result()?;
    assert_eq!(organization.name, "Happy Paws");
    assert_eq!(organization.max_users, 25);
    Ok(())
}

#[test]
fn emails_are_unique_ignoring_case() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let err = TestClinic::expect_failure(
        clinic
            .engine
            .create_organization_with_owner(fixtures::sign_up("Copycat", "OLIVE@HappyPaws.test")),
    );
    assert_eq!(err.issues()[0].path, "emailAddress");
    Ok(())
}

#[test]
fn accounts_and_sessions_survive_a_restart() -> TestResult {
    let mut clinic = TestClinic::on_disk()?;
    let dog = clinic.dog("Rex")?;

    let mut restarted = clinic.reopen()?;
    let user = restarted.validate_session_token(&clinic.token).into_result()?;
    assert_eq!(user.user_id, clinic.owner.user_id);
    let detail = restarted.get_dog(&user, &dog.id).into_result()?;
    assert_eq!(detail.dog, dog);
    Ok(())
}

#[test]
fn sign_up_reports_every_missing_field() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let mut input = fixtures::sign_up("", "not-an-email");
    input.given_name = "   ".into();
    let err = TestClinic::expect_failure(clinic.engine.create_organization_with_owner(input));

    let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"organizationName"));
    assert!(paths.contains(&"givenName"));
    assert!(paths.contains(&"emailAddress"));
    Ok(())
}

#[test]
fn update_organization_needs_a_manager() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    let input = OrganizationInput {
        name: "Happier Paws".into(),
        email_address: None,
    };

    let err = TestClinic::expect_failure(
        clinic.engine.update_organization(&member.user, input.clone()),
    );
    assert!(err.message().is_some_and(|m| m.starts_with("Only owners and admins")));

    let updated = clinic
        .engine
        .update_organization(&clinic.owner, input)
        .into_result()?;
    assert_eq!(updated.name, "Happier Paws");
    assert_eq!(updated.email_address, None);
    Ok(())
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn token_resolves_to_the_signed_in_user() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let token = clinic.token.clone();
    let current = clinic.engine.validate_session_token(&token).into_result()?;
    assert_eq!(current, clinic.owner);
    Ok(())
}

#[test]
fn unknown_token_is_unauthenticated() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let err = TestClinic::expect_failure(clinic.engine.validate_session_token("deadbeef"));
    assert_eq!(err.message(), Some("not signed in"));
    Ok(())
}

#[test]
fn signed_out_token_stops_working() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let token = clinic.token.clone();
    clinic.engine.invalidate_session(&token).into_result()?;
    assert!(!clinic.engine.validate_session_token(&token).is_success());

    // Other sessions for the same user are untouched.
    let second = clinic.engine.create_session(&clinic.owner.user_id).into_result()?;
    assert!(clinic.engine.validate_session_token(&second.token).is_success());
    Ok(())
}

#[test]
fn expired_session_is_rejected_and_removed() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let token = clinic.token.clone();
    let owner_sessions = Filter::all().eq("user_id", clinic.owner.user_id.as_str().to_string());
    let past = Utc::now() - Duration::minutes(1);
    clinic.engine.storage_mut().transaction(|tx| {
        tx.update::<AuthSession>(
            &Changeset::new().set("expires_at", timestamp(past)),
            &owner_sessions,
        )
    })?;

    let err = TestClinic::expect_failure(clinic.engine.validate_session_token(&token));
    assert_eq!(err.message(), Some("not signed in"));
    assert_eq!(clinic.engine.storage().count::<AuthSession>(&owner_sessions)?, 0);
    Ok(())
}

#[test]
fn sessions_near_expiry_are_extended() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let token = clinic.token.clone();
    let owner_sessions = Filter::all().eq("user_id", clinic.owner.user_id.as_str().to_string());
    let soon = Utc::now() + Duration::days(2);
    clinic.engine.storage_mut().transaction(|tx| {
        tx.update::<AuthSession>(
            &Changeset::new().set("expires_at", timestamp(soon)),
            &owner_sessions,
        )
    })?;

    clinic.engine.validate_session_token(&token).into_result()?;

    let session = clinic
        .engine
        .storage()
        .find_first::<AuthSession>(&FindMany::new(owner_sessions))?
        .ok_or("session missing")?;
    assert!(session.expires_at > Utc::now() + Duration::days(29));
    Ok(())
}

#[test]
fn session_lifetime_follows_config() -> TestResult {
    let config = EngineConfig {
        session_ttl_days: 3,
        ..EngineConfig::in_memory()
    };
    let mut clinic = TestClinic::with_config(config)?;
    let signed_in = clinic.engine.create_session(&clinic.owner.user_id).into_result()?;
    let lifetime = signed_in.expires_at - Utc::now();
    assert!(lifetime <= Duration::days(3));
    assert!(lifetime > Duration::days(3) - Duration::minutes(1));
    Ok(())
}

#[test]
fn out_of_range_lifetimes_fail_without_panicking() -> TestResult {
    let config = EngineConfig {
        session_ttl_days: i64::MAX / 2,
        ..EngineConfig::in_memory()
    };
    let mut engine = kennel_engine::Engine::open(config)?;
    let err = TestClinic::expect_failure(
        engine.create_organization_with_owner(fixtures::sign_up("Happy Paws", "olive@happypaws.test")),
    );
    assert_eq!(err.message(), Some("Failed to create organization"));
    assert_eq!(engine.storage().count::<Organization>(&Filter::all())?, 0);

    let config = EngineConfig {
        invite_link_ttl_days: i64::MAX,
        ..EngineConfig::in_memory()
    };
    let mut clinic = TestClinic::with_config(config)?;
    let err = TestClinic::expect_failure(clinic.engine.create_invite_link(
        &clinic.owner,
        InviteLinkInput {
            organization_role: OrganizationRole::Member,
            max_uses: None,
        },
    ));
    assert_eq!(err.message(), Some("Failed to create invite link"));
    Ok(())
}

// ============================================================================
// Invite links
// ============================================================================

#[test]
fn accepted_invite_joins_with_the_link_role() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let link = invite(&mut clinic, OrganizationRole::Admin, None)?;
    let joined = clinic
        .engine
        .accept_invite_link(&link.id, fixtures::join("Ada", "Ada@Example.com"))
        .into_result()?;

    assert_eq!(joined.user.organization_id, clinic.owner.organization_id);
    assert_eq!(joined.user.organization_role, OrganizationRole::Admin);
    assert_eq!(joined.user.email_address, "ada@example.com");
    assert!(clinic.engine.validate_session_token(&joined.token).is_success());

    let links = clinic.engine.list_invite_links(&clinic.owner).into_result()?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].uses, 1);
    Ok(())
}

#[test]
fn invite_links_cannot_grant_ownership() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let err = TestClinic::expect_failure(clinic.engine.create_invite_link(
        &clinic.owner,
        InviteLinkInput {
            organization_role: OrganizationRole::Owner,
            max_uses: None,
        },
    ));
    assert_eq!(err.issues()[0].path, "organizationRole");
    Ok(())
}

#[test]
fn members_cannot_create_invite_links() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    let response = clinic.engine.create_invite_link(
        &member.user,
        InviteLinkInput {
            organization_role: OrganizationRole::Member,
            max_uses: None,
        },
    );
    assert!(matches!(response, ActionResponse::Failure(_)));
    Ok(())
}

#[test]
fn used_up_link_is_rejected() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let link = invite(&mut clinic, OrganizationRole::Member, Some(1))?;
    clinic
        .engine
        .accept_invite_link(&link.id, fixtures::join("Ada", "ada@example.com"))
        .into_result()?;

    let err = TestClinic::expect_failure(
        clinic
            .engine
            .accept_invite_link(&link.id, fixtures::join("Grace", "grace@example.com")),
    );
    assert_eq!(
        err.message(),
        Some("This invite link has expired or reached its usage limit")
    );
    Ok(())
}

#[test]
fn expired_link_is_rejected() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let link = invite(&mut clinic, OrganizationRole::Member, None)?;
    let past = Utc::now() - Duration::hours(1);
    clinic.engine.storage_mut().transaction(|tx| {
        tx.update::<OrganizationInviteLink>(
            &Changeset::new().set("expires_at", timestamp(past)),
            &Filter::all().id(link.id.as_str()),
        )
    })?;

    let response = clinic
        .engine
        .accept_invite_link(&link.id, fixtures::join("Ada", "ada@example.com"));
    assert!(!response.is_success());
    let members = clinic
        .engine
        .list_users(&clinic.owner, &PaginationParams::default())
        .into_result()?;
    assert_eq!(members.pagination.count, 1);
    Ok(())
}

#[test]
fn unknown_link_is_not_found() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let id = InviteLinkId::new();
    let err = TestClinic::expect_failure(
        clinic
            .engine
            .accept_invite_link(&id, fixtures::join("Ada", "ada@example.com")),
    );
    assert_eq!(err.message(), Some(format!("invite link not found: {id}").as_str()));
    Ok(())
}

#[test]
fn full_organization_turns_new_members_away() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let org = clinic.owner.organization_id.clone();
    clinic.engine.storage_mut().transaction(|tx| {
        tx.update::<Organization>(
            &Changeset::new().set("max_users", 2i64),
            &Filter::all().id(org.as_str()),
        )
    })?;

    let link = invite(&mut clinic, OrganizationRole::Member, None)?;
    clinic
        .engine
        .accept_invite_link(&link.id, fixtures::join("Ada", "ada@example.com"))
        .into_result()?;
    let err = TestClinic::expect_failure(
        clinic
            .engine
            .accept_invite_link(&link.id, fixtures::join("Grace", "grace@example.com")),
    );
    assert_eq!(err.message(), Some("This organization has no seats left"));

    // The rejected attempt did not count as a use.
    let links = clinic.engine.list_invite_links(&clinic.owner).into_result()?;
    assert_eq!(links[0].uses, 1);
    Ok(())
}

#[test]
fn taken_email_does_not_consume_the_link() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let link = invite(&mut clinic, OrganizationRole::Member, Some(1))?;
    let err = TestClinic::expect_failure(
        clinic
            .engine
            .accept_invite_link(&link.id, fixtures::join("Olive", "olive@happypaws.test")),
    );
    assert_eq!(err.issues()[0].path, "emailAddress");

    clinic
        .engine
        .accept_invite_link(&link.id, fixtures::join("Ada", "ada@example.com"))
        .into_result()?;
    Ok(())
}

#[test]
fn deleted_link_can_no_longer_be_used() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let link = invite(&mut clinic, OrganizationRole::Member, None)?;
    clinic.engine.delete_invite_link(&clinic.owner, &link.id).into_result()?;

    assert!(clinic.engine.list_invite_links(&clinic.owner).into_result()?.is_empty());
    assert!(
        !clinic
            .engine
            .accept_invite_link(&link.id, fixtures::join("Ada", "ada@example.com"))
            .is_success()
    );
    Ok(())
}

#[test]
fn invite_link_lifetime_follows_config() -> TestResult {
    let config = EngineConfig {
        invite_link_ttl_days: 2,
        ..EngineConfig::in_memory()
    };
    let mut clinic = TestClinic::with_config(config)?;
    let link = invite(&mut clinic, OrganizationRole::Member, None)?;
    assert_eq!(link.expires_at - link.created_at, Duration::days(2));
    Ok(())
}

// ============================================================================
// Members and roles
// ============================================================================

#[test]
fn owner_promotes_a_member() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    let promoted = clinic
        .engine
        .update_user_role(&clinic.owner, &member.user.user_id, OrganizationRole::Admin)
        .into_result()?;
    assert_eq!(promoted.organization_role, OrganizationRole::Admin);

    // The promotion is visible on the next request.
    let current = clinic.engine.validate_session_token(&member.token).into_result()?;
    assert_eq!(current.organization_role, OrganizationRole::Admin);
    Ok(())
}

#[test]
fn role_changes_are_owner_only() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let admin = clinic.member(OrganizationRole::Admin, "adele@happypaws.test")?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;

    let err = TestClinic::expect_failure(clinic.engine.update_user_role(
        &admin.user,
        &member.user.user_id,
        OrganizationRole::Admin,
    ));
    assert_eq!(err.message(), Some("Only the owner can change member roles"));

    let err = TestClinic::expect_failure(clinic.engine.update_user_role(
        &clinic.owner,
        &member.user.user_id,
        OrganizationRole::Owner,
    ));
    assert_eq!(err.issues()[0].path, "organizationRole");

    let err = TestClinic::expect_failure(clinic.engine.update_user_role(
        &clinic.owner,
        &clinic.owner.user_id,
        OrganizationRole::Member,
    ));
    assert_eq!(err.issues()[0].message, "You cannot change your own role");
    Ok(())
}

#[test]
fn admins_remove_members_but_never_the_owner() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let admin = clinic.member(OrganizationRole::Admin, "adele@happypaws.test")?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;

    let err = TestClinic::expect_failure(
        clinic.engine.remove_user(&admin.user, &clinic.owner.user_id),
    );
    assert_eq!(err.message(), Some("The organization owner cannot be removed"));

    clinic
        .engine
        .remove_user(&admin.user, &member.user.user_id)
        .into_result()?;
    // Their sessions went with them.
    assert!(!clinic.engine.validate_session_token(&member.token).is_success());

    let users = clinic
        .engine
        .list_users(&clinic.owner, &PaginationParams::default())
        .into_result()?;
    assert_eq!(users.pagination.count, 2);
    Ok(())
}

#[test]
fn members_are_searchable_by_email() -> TestResult {
    let mut clinic = TestClinic::new()?;
    clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    clinic.member(OrganizationRole::Member, "sam@elsewhere.test")?;

    let users = clinic
        .engine
        .list_users(&clinic.owner, &PaginationParams::default().search("happypaws"))
        .into_result()?;
    assert_eq!(users.pagination.count, 2);
    Ok(())
}
