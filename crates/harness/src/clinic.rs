use std::fmt;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use kennel_core::models::{
    Booking, BookingType, Client, Dog, InviteLinkInput, OrganizationRole, Vet, VetClinic,
};
use kennel_core::{ActionLog, CurrentUser};
use kennel_engine::{
    ActionError, ActionResponse, DogRelationshipLogs, Engine, EngineConfig, SignedIn,
    VetRelationshipLogs,
};

use crate::{TestResult, fixtures};

/// An engine with one signed-up organization. The owner is the default
/// actor for every helper.
pub struct TestClinic {
    pub engine: Engine,
    pub owner: CurrentUser,
    pub token: String,
    _dir: Option<TempDir>,
}

impl TestClinic {
    pub fn new() -> TestResult<Self> {
        Self::with_config(EngineConfig::in_memory())
    }

    /// Same as [`TestClinic::new`] but backed by a database file in a
    /// temporary directory that lives as long as the clinic.
    pub fn on_disk() -> TestResult<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kennel.db");
        let path = path.to_str().ok_or("non-utf8 temp path")?;
        let mut clinic = Self::with_config(EngineConfig::in_memory().with_database_path(path))?;
        clinic._dir = Some(dir);
        Ok(clinic)
    }

    /// A second engine on the same database file.
    pub fn reopen(&self) -> TestResult<Engine> {
        Ok(Engine::open(self.engine.config().clone())?)
    }

    pub fn with_config(config: EngineConfig) -> TestResult<Self> {
        let mut engine = Engine::open(config)?;
        let signed_in = engine
            .create_organization_with_owner(fixtures::sign_up("Happy Paws", "olive@happypaws.test"))
            .into_result()?;
        Ok(Self {
            engine,
            owner: signed_in.user,
            token: signed_in.token,
            _dir: None,
        })
    }

    /// Sign up a second organization on the same database.
    pub fn other_organization(&mut self, email_address: &str) -> TestResult<SignedIn> {
        let signed_in = self
            .engine
            .create_organization_with_owner(fixtures::sign_up("Muddy Boots", email_address))
            .into_result()?;
        Ok(signed_in)
    }

    /// Invite and sign in a member with `role`.
    pub fn member(
        &mut self,
        role: OrganizationRole,
        email_address: &str,
    ) -> TestResult<SignedIn> {
        let link = self
            .engine
            .create_invite_link(
                &self.owner,
                InviteLinkInput {
                    organization_role: role,
                    max_uses: Some(1),
                },
            )
            .into_result()?;
        let signed_in = self
            .engine
            .accept_invite_link(&link.id, fixtures::join("Mel", email_address))
            .into_result()?;
        Ok(signed_in)
    }

    pub fn dog(&mut self, given_name: &str) -> TestResult<Dog> {
        let dog = self
            .engine
            .insert_dog(
                &self.owner,
                fixtures::dog_input(given_name),
                DogRelationshipLogs::default(),
            )
            .into_result()?;
        Ok(dog)
    }

    pub fn client(&mut self, given_name: &str, family_name: &str) -> TestResult<Client> {
        let client = self
            .engine
            .insert_client(
                &self.owner,
                fixtures::client_input(given_name, family_name),
                ActionLog::new(),
            )
            .into_result()?;
        Ok(client)
    }

    pub fn vet(&mut self, given_name: &str) -> TestResult<Vet> {
        let vet = self
            .engine
            .insert_vet(
                &self.owner,
                fixtures::vet_input(given_name),
                VetRelationshipLogs::default(),
            )
            .into_result()?;
        Ok(vet)
    }

    pub fn vet_clinic(&mut self, name: &str) -> TestResult<VetClinic> {
        let clinic = self
            .engine
            .insert_vet_clinic(&self.owner, fixtures::vet_clinic_input(name), ActionLog::new())
            .into_result()?;
        Ok(clinic)
    }

    pub fn booking_type(&mut self, name: &str, is_default: bool) -> TestResult<BookingType> {
        let booking_type = self
            .engine
            .insert_booking_type(
                &self.owner,
                fixtures::booking_type_input(name, 60, is_default),
            )
            .into_result()?;
        Ok(booking_type)
    }

    pub fn booking(&mut self, dog: &Dog, date: DateTime<Utc>) -> TestResult<Booking> {
        let booking = self
            .engine
            .insert_booking(&self.owner, fixtures::booking_input(Some(dog.id.clone()), date))
            .into_result()?;
        Ok(booking)
    }

    /// Unwrap a failure, panicking with the payload on success.
    pub fn expect_failure<T: fmt::Debug>(response: ActionResponse<T>) -> ActionError {
        match response {
            ActionResponse::Failure(err) => err,
            ActionResponse::Success(data) => panic!("expected a failure, got {data:?}"),
        }
    }
}
