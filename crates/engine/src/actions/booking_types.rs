use chrono::{DateTime, Utc};
use tracing::info;

use kennel_core::models::{BookingType, BookingTypeInput};
use kennel_core::{BookingTypeId, CurrentUser, OrganizationId, PaginationParams, SortableColumns};
use kennel_storage::record::{flag, timestamp};
use kennel_storage::{Changeset, Filter, Record, StorageTx, WriteStorage};

use super::{Paginated, find_owned, list_page, validate};
use crate::response::{ActionResponse, respond};
use crate::{Engine, EngineError};

fn sortable_columns() -> SortableColumns {
    SortableColumns::new("id")
        .with("name", &["name"])
        .with("duration", &["duration"])
        .with("isDefault", &["is_default"])
        .with("createdAt", &["created_at"])
        .with("updatedAt", &["updated_at"])
}

impl Engine {
    // ========================================================================
    // Booking types
    // ========================================================================

    pub fn list_booking_types(
        &self,
        user: &CurrentUser,
        params: &PaginationParams,
    ) -> ActionResponse<Paginated<BookingType>> {
        respond("list booking types", || {
            let filter =
                Filter::tenant(&user.organization_id).search(&["name"], params.search_term());
            list_page(
                &self.storage,
                filter,
                params,
                &sortable_columns(),
                self.config.default_page_size,
            )
        })
    }

    /// A new default replaces the previous one.
    pub fn insert_booking_type(
        &mut self,
        user: &CurrentUser,
        input: BookingTypeInput,
    ) -> ActionResponse<BookingType> {
        let now = self.now();
        respond("insert booking type", || {
            validate(&input)?;
            let org = &user.organization_id;
            let booking_type = BookingType::from_input(input, org.clone(), now);
            self.storage.transaction(|tx| {
                if booking_type.is_default {
                    clear_default(tx, org, &booking_type.id, now)?;
                }
                tx.insert(std::slice::from_ref(&booking_type))?;
                Ok::<_, EngineError>(())
            })?;
            info!(organization_id = %org, booking_type_id = %booking_type.id, "booking type created");
            Ok(booking_type)
        })
    }

    pub fn update_booking_type(
        &mut self,
        user: &CurrentUser,
        input: BookingTypeInput,
    ) -> ActionResponse<BookingType> {
        let now = self.now();
        respond("update booking type", || {
            validate(&input)?;
            let org = &user.organization_id;
            let booking_type = self.storage.transaction(|tx| {
                let mut booking_type: BookingType =
                    find_owned(tx, org, "booking type", input.id.as_str())?;
                booking_type.apply_input(input, now);
                if booking_type.is_default {
                    clear_default(tx, org, &booking_type.id, now)?;
                }
                tx.update::<BookingType>(
                    &booking_type.changes(),
                    &Filter::tenant(org).id(booking_type.id.as_str()),
                )?;
                Ok::<_, EngineError>(booking_type)
            })?;
            info!(organization_id = %org, booking_type_id = %booking_type.id, "booking type updated");
            Ok(booking_type)
        })
    }

    /// Bookings of this type keep existing with no type.
    pub fn delete_booking_type(
        &mut self,
        user: &CurrentUser,
        id: &BookingTypeId,
    ) -> ActionResponse<()> {
        respond("delete booking type", || {
            let org = &user.organization_id;
            let deleted = self.storage.transaction(|tx| {
                tx.delete::<BookingType>(&Filter::tenant(org).id(id.as_str()))
            })?;
            if deleted == 0 {
                return Err(EngineError::not_found("booking type", id));
            }
            info!(organization_id = %org, booking_type_id = %id, "booking type deleted");
            Ok(())
        })
    }
}

fn clear_default(
    tx: &StorageTx<'_>,
    organization_id: &OrganizationId,
    keep: &BookingTypeId,
    now: DateTime<Utc>,
) -> Result<usize, EngineError> {
    let changes = Changeset::new()
        .set("is_default", flag(false))
        .set("updated_at", timestamp(now));
    let filter = Filter::tenant(organization_id)
        .eq("is_default", flag(true))
        .not_eq("id", keep.as_str().to_string());
    Ok(tx.update::<BookingType>(&changes, &filter)?)
}
