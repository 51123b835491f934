use tracing::info;

use kennel_core::models::{Booking, BookingInput, BookingType, Dog, User};
use kennel_core::{
    BookingId, CurrentUser, CursorPage, DogId, OrganizationId, PaginationParams, SeekKey,
    SortDirection, SortableColumns,
};
use kennel_storage::{Filter, ReadStorage, Record, WriteStorage};

use super::{Paginated, cursor_page, list_page, validate};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

const DOG_BOOKING_KEY: SeekKey = SeekKey {
    column: "date",
    id_column: "id",
    direction: SortDirection::Desc,
};

fn sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("date", &["date"])
        .with("duration", &["duration"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

impl Engine {
    // ========================================================================
    // Bookings
    // ========================================================================

    pub fn list_bookings(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<Booking>> {
        respond("list bookings", || {
            let filter =
                Filter::tenant(&user.organization_id).search(&["details"], params.search_term());
            list_page(
                &self.storage,
                filter,
                params,
                &sortable_columns(),
                self.config.default_page_size,
            )
        })
    }

    /// A dog's bookings newest first, `bookings_page_size` at a time.
    pub fn list_dog_bookings(
        &self,
        user: &CurrentUser,
        dog_id: &DogId,
        cursor: Option<&str>,
    ) -> ActionResponse<CursorPage<Booking>> {
        respond("list dog bookings", || {
            let filter =
                Filter::tenant(&user.organization_id).eq("dog_id", dog_id.as_str().to_string());
            cursor_page(
                &self.storage,
                filter,
                &DOG_BOOKING_KEY,
                cursor,
                self.config.bookings_page_size,
            )
        })
    }

    pub fn insert_booking(
        &mut self,
        user: &CurrentUser,
        input: BookingInput,
    ) -> ActionResponse<Booking> {
        let now = self.now();
        respond("insert booking", || {
            validate(&input)?;
            let org = &user.organization_id;
            let booking = Booking::from_input(input, org.clone(), now);
            self.storage.transaction(|tx| {
                ensure_references(tx, org, &booking)?;
                tx.insert(std::slice::from_ref(&booking))?;
                Ok::<_, EngineError>(())
            })?;
            info!(organization_id = %org, booking_id = %booking.id, "booking created");
            Ok(booking)
        })
    }

    pub fn update_booking(
        &mut self,
        user: &CurrentUser,
        input: BookingInput,
    ) -> ActionResponse<Booking> {
        let now = self.now();
        respond("update booking", || {
            validate(&input)?;
            let org = &user.organization_id;
            let booking = self.storage.transaction(|tx| {
                let mut booking: Booking =
                    super::find_owned(tx, org, "booking", input.id.as_str())?;
                booking.apply_input(input, now);
                ensure_references(tx, org, &booking)?;
                tx.update::<Booking>(
                    &booking.changes(),
                    &Filter::tenant(org).id(booking.id.as_str()),
                )?;
                Ok::<_, EngineError>(booking)
            })?;
            info!(organization_id = %org, booking_id = %booking.id, "booking updated");
            Ok(booking)
        })
    }

    pub fn delete_booking(&mut self, user: &CurrentUser, id: &BookingId) -> ActionResponse<()> {
        respond("delete booking", || {
            let org = &user.organization_id;
            let deleted = self
                .storage
                .transaction(|tx| tx.delete::<Booking>(&Filter::tenant(org).id(id.as_str())))?;
            if deleted == 0 {
                return Err(EngineError::not_found("booking", id));
            }
            info!(organization_id = %org, booking_id = %id, "booking deleted");
            Ok(())
        })
    }
}

/// Dog, booking type and assignee must all belong to the booking's
/// organization.
fn ensure_references(
    storage: &impl ReadStorage,
    organization_id: &OrganizationId,
    booking: &Booking,
) -> Result<(), EngineError> {
    let tenant = || Filter::tenant(organization_id);
    if let Some(dog_id) = &booking.dog_id
        && storage.count::<Dog>(&tenant().id(dog_id.as_str()))? == 0
    {
        return Err(EngineError::invalid("dogId", "Dog not found"));
    }
    if let Some(type_id) = &booking.booking_type_id
        && storage.count::<BookingType>(&tenant().id(type_id.as_str()))? == 0
    {
        return Err(EngineError::invalid("bookingTypeId", "Booking type not found"));
    }
    if let Some(user_id) = &booking.assigned_to_id
        && storage.count::<User>(&tenant().id(user_id.as_str()))? == 0
    {
        return Err(EngineError::invalid("assignedToId", "User not found"));
    }
    Ok(())
}
