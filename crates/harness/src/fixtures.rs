//! Valid inputs with sensible defaults. Tests tweak the fields they care
//! about.

use chrono::{DateTime, TimeZone, Utc};

use kennel_core::models::{
    AcceptInviteInput, BookingInput, BookingTypeInput, ClientInput, Dog, DogInput, DogSession,
    DogSex, SignUpInput, Vet, VetClinicInput, VetInput,
};
use kennel_core::{
    BookingId, BookingTypeId, ClientId, DogId, DogSessionId, OrganizationId, VetClinicId, VetId,
};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn sign_up(organization_name: &str, email_address: &str) -> SignUpInput {
    SignUpInput {
        organization_name: organization_name.into(),
        given_name: "Olive".into(),
        family_name: "Owner".into(),
        email_address: email_address.into(),
    }
}

pub fn join(given_name: &str, email_address: &str) -> AcceptInviteInput {
    AcceptInviteInput {
        given_name: given_name.into(),
        family_name: "Member".into(),
        email_address: email_address.into(),
    }
}

pub fn dog_input(given_name: &str) -> DogInput {
    DogInput {
        id: DogId::new(),
        given_name: given_name.into(),
        breed: "Border Collie".into(),
        color: "Black and white".into(),
        sex: DogSex::Female,
        desexed: true,
        date_of_birth: at(2019, 6, 1, 0),
        is_age_estimate: false,
        notes: None,
    }
}

/// The form for an existing dog, as the edit page would submit it.
pub fn dog_form(dog: &Dog) -> DogInput {
    DogInput {
        id: dog.id.clone(),
        given_name: dog.given_name.clone(),
        breed: dog.breed.clone(),
        color: dog.color.clone(),
        sex: dog.sex,
        desexed: dog.desexed,
        date_of_birth: dog.date_of_birth,
        is_age_estimate: dog.is_age_estimate,
        notes: dog.notes.clone(),
    }
}

pub fn client_input(given_name: &str, family_name: &str) -> ClientInput {
    ClientInput {
        id: ClientId::new(),
        given_name: given_name.into(),
        family_name: family_name.into(),
        email_address: Some(format!("{}@example.com", given_name.to_lowercase())),
        phone_number: None,
        street_address: None,
        city: Some("Wellington".into()),
        state: None,
        postal_code: None,
        notes: None,
    }
}

pub fn vet_input(given_name: &str) -> VetInput {
    VetInput {
        id: VetId::new(),
        given_name: given_name.into(),
        family_name: "Herriot".into(),
        email_address: None,
        phone_number: Some("+64 4 555 0100".into()),
        notes: None,
    }
}

pub fn vet_form(vet: &Vet) -> VetInput {
    VetInput {
        id: vet.id.clone(),
        given_name: vet.given_name.clone(),
        family_name: vet.family_name.clone(),
        email_address: vet.email_address.clone(),
        phone_number: vet.phone_number.clone(),
        notes: vet.notes.clone(),
    }
}

pub fn vet_clinic_input(name: &str) -> VetClinicInput {
    VetClinicInput {
        id: VetClinicId::new(),
        name: name.into(),
        email_address: Some("front-desk@clinic.example".into()),
        phone_number: None,
        notes: None,
    }
}

pub fn booking_type_input(name: &str, duration: i64, is_default: bool) -> BookingTypeInput {
    BookingTypeInput {
        id: BookingTypeId::new(),
        name: name.into(),
        duration,
        details: None,
        is_default,
    }
}

pub fn booking_input(dog_id: Option<DogId>, date: DateTime<Utc>) -> BookingInput {
    BookingInput {
        id: BookingId::new(),
        dog_id,
        assigned_to_id: None,
        booking_type_id: None,
        date,
        duration: 60,
        details: None,
    }
}

/// A session row staged client-side for `dog_id`.
pub fn dog_session(dog_id: &DogId, date: DateTime<Utc>, details: &str) -> DogSession {
    DogSession {
        id: DogSessionId::new(),
        organization_id: OrganizationId::from_string(""),
        dog_id: dog_id.clone(),
        user_id: None,
        date,
        details: Some(details.into()),
        created_at: date,
        updated_at: date,
    }
}
