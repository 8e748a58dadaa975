//! The editable checkout form.

use verger_core::{FulfillmentType, PaymentMethod};

use super::fulfillment::{PickupLocation, TimeSlot};
use crate::models::UserProfile;
use crate::zones::{DeliveryZone, ZoneDirectory};

/// Form state while the shopper fills in checkout. Never persisted.
///
/// Contact fields are plain public strings. Fulfillment and payment fields
/// go through setters because changing them has side effects on the rest of
/// the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    fulfillment: FulfillmentType,
    pickup: Option<PickupLocation>,
    street: String,
    postal_code: String,
    city: String,
    city_locked: bool,
    time_slot: Option<TimeSlot>,
    suggestions: Vec<DeliveryZone>,
    payment_method: PaymentMethod,
    discount_code: Option<String>,
}

impl CheckoutDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill empty contact fields from the signed-in profile.
    pub fn prefill_from(&mut self, user: &UserProfile) {
        if self.full_name.trim().is_empty() {
            self.full_name.clone_from(&user.name);
        }
        if self.email.trim().is_empty() {
            self.email = user.email.to_string();
        }
        if self.phone.trim().is_empty()
            && let Some(phone) = &user.phone
        {
            self.phone.clone_from(phone);
        }
    }

    #[must_use]
    pub const fn fulfillment(&self) -> FulfillmentType {
        self.fulfillment
    }

    /// Switch between pickup and delivery.
    ///
    /// Leaving delivery clears the address, the time slot and the
    /// suggestions, and resets payment to cash. Leaving pickup clears the
    /// chosen shop.
    pub fn set_fulfillment(&mut self, fulfillment: FulfillmentType) {
        if self.fulfillment == fulfillment {
            return;
        }
        match fulfillment {
            FulfillmentType::Store => {
                self.street.clear();
                self.postal_code.clear();
                self.city.clear();
                self.city_locked = false;
                self.time_slot = None;
                self.suggestions.clear();
                self.payment_method = PaymentMethod::Cash;
            }
            FulfillmentType::Delivery => {
                self.pickup = None;
            }
        }
        self.fulfillment = fulfillment;
    }

    #[must_use]
    pub const fn pickup_location(&self) -> Option<PickupLocation> {
        self.pickup
    }

    pub fn set_pickup_location(&mut self, location: Option<PickupLocation>) {
        self.pickup = location;
    }

    #[must_use]
    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn set_street(&mut self, street: impl Into<String>) {
        self.street = street.into();
    }

    #[must_use]
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// Record a postal code as typed.
    ///
    /// An exact zone match fills in and locks the city. Anything else
    /// unlocks and clears the city and offers ranked suggestions.
    pub fn enter_postal_code(&mut self, code: &str, zones: &ZoneDirectory) {
        if let Some(zone) = zones.zone_for_code(code) {
            self.apply_zone(zone.clone());
            return;
        }
        self.postal_code = code.to_owned();
        self.city.clear();
        self.city_locked = false;
        self.suggestions = zones.suggestions_for(code).into_iter().cloned().collect();
    }

    /// Current postal code suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &[DeliveryZone] {
        &self.suggestions
    }

    /// Pick one of the current suggestions. Returns `false` for an
    /// out-of-range index.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        let Some(zone) = self.suggestions.get(index).cloned() else {
            return false;
        };
        self.apply_zone(zone);
        true
    }

    fn apply_zone(&mut self, zone: DeliveryZone) {
        self.postal_code = zone.postal_code;
        self.city = zone.city;
        self.city_locked = true;
        self.suggestions.clear();
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Whether the city was filled from a zone and is read-only.
    #[must_use]
    pub const fn is_city_locked(&self) -> bool {
        self.city_locked
    }

    /// Set the city by hand. Ignored (returns `false`) while locked.
    pub fn set_city(&mut self, city: impl Into<String>) -> bool {
        if self.city_locked {
            return false;
        }
        self.city = city.into();
        true
    }

    #[must_use]
    pub const fn time_slot(&self) -> Option<TimeSlot> {
        self.time_slot
    }

    pub fn set_time_slot(&mut self, slot: Option<TimeSlot>) {
        self.time_slot = slot;
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    /// Discount code. The current checkout never sets one.
    #[must_use]
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }
}
