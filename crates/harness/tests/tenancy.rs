use chrono::Utc;

use kennel_core::models::{DogToClientRelationship, DogToClientRelationshipKind, OrganizationRole};
use kennel_core::{ActionLog, PaginationParams};
use kennel_engine::DogRelationshipLogs;
use kennel_harness::{TestClinic, TestResult, fixtures};

// ============================================================================
// Reads
// ============================================================================

#[test]
fn lists_only_show_the_callers_organization() -> TestResult {
    let mut clinic = TestClinic::new()?;
    clinic.dog("Rex")?;
    clinic.client("Ada", "Lovelace")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let dogs = clinic
        .engine
        .list_dogs(&rival.user, &PaginationParams::default())
        .into_result()?;
    assert_eq!(dogs.pagination.count, 0);
    let clients = clinic
        .engine
        .list_clients(&rival.user, &PaginationParams::default())
        .into_result()?;
    assert!(clients.items.is_empty());
    let users = clinic
        .engine
        .list_users(&rival.user, &PaginationParams::default())
        .into_result()?;
    assert_eq!(users.pagination.count, 1);
    Ok(())
}

#[test]
fn foreign_records_read_as_not_found() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let dog = clinic.dog("Rex")?;
    let vet = clinic.vet("James")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let err = TestClinic::expect_failure(clinic.engine.get_dog(&rival.user, &dog.id));
    assert_eq!(err.message(), Some(format!("dog not found: {}", dog.id).as_str()));
    assert!(!clinic.engine.get_vet(&rival.user, &vet.id).is_success());
    assert!(
        clinic
            .engine
            .list_dog_sessions(&rival.user, &dog.id, None)
            .into_result()?
            .items
            .is_empty()
    );
    Ok(())
}

#[test]
fn invite_links_are_listed_per_organization() -> TestResult {
    let mut clinic = TestClinic::new()?;
    clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;
    assert!(clinic.engine.list_invite_links(&rival.user).into_result()?.is_empty());
    assert_eq!(clinic.engine.list_invite_links(&clinic.owner).into_result()?.len(), 1);
    Ok(())
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn foreign_records_cannot_be_updated_or_deleted() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let dog = clinic.dog("Rex")?;
    let client = clinic.client("Ada", "Lovelace")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let mut input = fixtures::dog_form(&dog);
    input.given_name = "Stolen".into();
    assert!(
        !clinic
            .engine
            .update_dog(&rival.user, input, DogRelationshipLogs::default())
            .is_success()
    );
    assert!(!clinic.engine.delete_dog(&rival.user, &dog.id).is_success());
    assert!(!clinic.engine.delete_client(&rival.user, &client.id).is_success());

    let detail = clinic.engine.get_dog(&clinic.owner, &dog.id).into_result()?;
    assert_eq!(detail.dog.given_name, "Rex");
    assert!(clinic.engine.get_client(&clinic.owner, &client.id).is_success());
    Ok(())
}

#[test]
fn links_to_foreign_clients_are_rejected() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let client = clinic.client("Ada", "Lovelace")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let input = fixtures::dog_input("Spy");
    let mut logs = DogRelationshipLogs::default();
    logs.clients.stage_insert(DogToClientRelationship::new(
        input.id.clone(),
        client.id.clone(),
        DogToClientRelationshipKind::Owner,
        Utc::now(),
    ));
    let err = TestClinic::expect_failure(clinic.engine.insert_dog(&rival.user, input, logs));
    assert_eq!(err.issues()[0].path, "clients");

    let detail = clinic.engine.get_client(&clinic.owner, &client.id).into_result()?;
    assert!(detail.dogs.is_empty());
    Ok(())
}

#[test]
fn foreign_relationship_rows_cannot_be_deleted() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let client = clinic.client("Ada", "Lovelace")?;
    let dog = clinic.dog("Rex")?;
    let row = DogToClientRelationship::new(
        dog.id.clone(),
        client.id.clone(),
        DogToClientRelationshipKind::Owner,
        Utc::now(),
    );
    let mut clients = ActionLog::new();
    clients.stage_insert(row.clone());
    clinic
        .engine
        .update_dog(
            &clinic.owner,
            fixtures::dog_form(&dog),
            DogRelationshipLogs {
                clients,
                ..Default::default()
            },
        )
        .into_result()?;

    // A rival submits a delete for the row against a dog of their own.
    let rival = clinic.other_organization("boss@muddyboots.test")?;
    let decoy = clinic
        .engine
        .insert_dog(&rival.user, fixtures::dog_input("Decoy"), DogRelationshipLogs::default())
        .into_result()?;
    let mut clients = ActionLog::<DogToClientRelationship>::new();
    clients.stage_delete(row.id.clone());
    clinic
        .engine
        .update_dog(
            &rival.user,
            fixtures::dog_form(&decoy),
            DogRelationshipLogs {
                clients,
                ..Default::default()
            },
        )
        .into_result()?;

    let detail = clinic.engine.get_dog(&clinic.owner, &dog.id).into_result()?;
    assert_eq!(detail.clients.len(), 1);
    assert_eq!(detail.clients[0].id, row.id);
    Ok(())
}

#[test]
fn bookings_cannot_reference_foreign_dogs_or_users() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let dog = clinic.dog("Rex")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let input = fixtures::booking_input(Some(dog.id.clone()), fixtures::at(2024, 6, 1, 9));
    let err = TestClinic::expect_failure(clinic.engine.insert_booking(&rival.user, input));
    assert_eq!(err.issues()[0].path, "dogId");

    let mut input = fixtures::booking_input(None, fixtures::at(2024, 6, 1, 9));
    input.assigned_to_id = Some(clinic.owner.user_id.clone());
    let err = TestClinic::expect_failure(clinic.engine.insert_booking(&rival.user, input));
    assert_eq!(err.issues()[0].path, "assignedToId");
    Ok(())
}

#[test]
fn members_of_one_organization_cannot_manage_another() -> TestResult {
    let mut clinic = TestClinic::new()?;
    let member = clinic.member(OrganizationRole::Member, "mel@happypaws.test")?;
    let rival = clinic.other_organization("boss@muddyboots.test")?;

    let err = TestClinic::expect_failure(
        clinic.engine.remove_user(&rival.user, &member.user.user_id),
    );
    assert_eq!(err.message(), Some(format!("user not found: {}", member.user.user_id).as_str()));
    assert!(clinic.engine.validate_session_token(&member.token).is_success());
    Ok(())
}
