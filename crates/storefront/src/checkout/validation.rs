//! Checkout form validation.
//!
//! Every rule runs; all failing fields are reported together.

use core::fmt;

use verger_core::{Email, FulfillmentType, PaymentMethod};

use super::draft::CheckoutDraft;
use super::fulfillment::FulfillmentDetails;
use crate::api::CustomerContact;
use crate::zones::ZoneDirectory;

/// Minimum length (trimmed) of the full name.
pub const MIN_NAME_CHARS: usize = 2;

/// Minimum length (trimmed) of the phone number.
pub const MIN_PHONE_CHARS: usize = 10;

/// A form field that can carry an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    Email,
    Phone,
    PickupLocation,
    Street,
    PostalCode,
    City,
    /// Not a form field; the cart being checked out.
    Cart,
}

impl Field {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FullName => "full name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::PickupLocation => "pickup location",
            Self::Street => "street",
            Self::PostalCode => "postal code",
            Self::City => "city",
            Self::Cart => "cart",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An error attached to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// All field errors of one validation run. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Errors in form order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// The error for `field`, if it failed.
    #[must_use]
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.for_field(field).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A checkout that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub customer: CustomerContact,
    pub fulfillment: FulfillmentDetails,
    pub payment_method: PaymentMethod,
    pub discount_code: Option<String>,
}

struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }
}

/// Validate a draft against the delivery zones.
///
/// # Errors
///
/// Returns every failing field when the draft cannot be submitted.
pub fn validate(
    draft: &CheckoutDraft,
    zones: &ZoneDirectory,
    cart_is_empty: bool,
) -> Result<ValidatedCheckout, ValidationErrors> {
    let mut errors = Collector(Vec::new());

    if cart_is_empty {
        errors.push(Field::Cart, "Your cart is empty");
    }

    let full_name = draft.full_name.trim();
    if full_name.is_empty() {
        errors.push(Field::FullName, "Full name is required");
    } else if full_name.chars().count() < MIN_NAME_CHARS {
        errors.push(
            Field::FullName,
            format!("Full name must be at least {MIN_NAME_CHARS} characters"),
        );
    }

    let email = Email::parse(&draft.email)
        .inspect_err(|e| errors.push(Field::Email, format!("Invalid email: {e}")))
        .ok();

    let phone = draft.phone.trim();
    if phone.chars().count() < MIN_PHONE_CHARS {
        errors.push(
            Field::Phone,
            format!("Phone number must be at least {MIN_PHONE_CHARS} characters"),
        );
    }

    let fulfillment = match draft.fulfillment() {
        FulfillmentType::Store => validate_pickup(draft, &mut errors),
        FulfillmentType::Delivery => validate_delivery(draft, zones, &mut errors),
    };

    match (email, fulfillment) {
        (Some(email), Some(fulfillment)) if errors.0.is_empty() => Ok(ValidatedCheckout {
            customer: CustomerContact {
                full_name: full_name.to_owned(),
                email,
                phone: phone.to_owned(),
            },
            fulfillment,
            payment_method: draft.payment_method(),
            discount_code: draft.discount_code().map(str::to_owned),
        }),
        _ => Err(ValidationErrors(errors.0)),
    }
}

fn validate_pickup(draft: &CheckoutDraft, errors: &mut Collector) -> Option<FulfillmentDetails> {
    let Some(pickup_location) = draft.pickup_location() else {
        errors.push(Field::PickupLocation, "Choose a pickup location");
        return None;
    };
    Some(FulfillmentDetails::Store { pickup_location })
}

fn validate_delivery(
    draft: &CheckoutDraft,
    zones: &ZoneDirectory,
    errors: &mut Collector,
) -> Option<FulfillmentDetails> {
    let street = draft.street().trim();
    if street.is_empty() {
        errors.push(Field::Street, "Street address is required");
    }

    let postal_code = draft.postal_code().trim();
    let zone = if postal_code.is_empty() {
        errors.push(Field::PostalCode, "Postal code is required");
        None
    } else {
        let zone = zones.zone_for_code(postal_code);
        if zone.is_none() {
            errors.push(
                Field::PostalCode,
                "We do not deliver to this postal code yet",
            );
        }
        zone
    };

    let city = draft.city().trim();
    if city.is_empty() {
        errors.push(Field::City, "City is required");
    }

    let zone = zone?;
    if street.is_empty() || city.is_empty() {
        return None;
    }
    Some(FulfillmentDetails::Delivery {
        street: street.to_owned(),
        postal_code: zone.postal_code.clone(),
        city: zone.city.clone(),
        time_slot: draft.time_slot(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::checkout::fulfillment::PickupLocation;

    fn contact_draft() -> CheckoutDraft {
        let mut draft = CheckoutDraft::new();
        draft.full_name = "Marie Curie".to_string();
        draft.email = "marie@example.fr".to_string();
        draft.phone = "0601020304".to_string();
        draft
    }

    #[test]
    fn test_valid_pickup() {
        let mut draft = contact_draft();
        draft.set_pickup_location(Some(PickupLocation::VincennesCentre));
        let validated = validate(&draft, &ZoneDirectory::default(), false).unwrap();
        assert_eq!(
            validated.fulfillment,
            FulfillmentDetails::Store {
                pickup_location: PickupLocation::VincennesCentre
            }
        );
        assert_eq!(validated.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_pickup_without_location() {
        let draft = contact_draft();
        let errors = validate(&draft, &ZoneDirectory::default(), false).unwrap_err();
        assert!(errors.has(Field::PickupLocation));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_all_failing_fields_reported() {
        let mut draft = CheckoutDraft::new();
        draft.full_name = "M".to_string();
        draft.email = "nope".to_string();
        draft.phone = "0601".to_string();
        let errors = validate(&draft, &ZoneDirectory::default(), true).unwrap_err();
        for field in [
            Field::Cart,
            Field::FullName,
            Field::Email,
            Field::Phone,
            Field::PickupLocation,
        ] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_delivery_outside_zones() {
        let zones = ZoneDirectory::default();
        let mut draft = contact_draft();
        draft.set_fulfillment(FulfillmentType::Delivery);
        draft.set_street("1 rue de Nulle Part");
        draft.enter_postal_code("00000", &zones);
        draft.set_city("Nowhere");

        let errors = validate(&draft, &zones, false).unwrap_err();
        assert!(errors.has(Field::PostalCode));
        assert!(!errors.has(Field::City));
    }

    #[test]
    fn test_valid_delivery_uses_zone() {
        let zones = ZoneDirectory::default();
        let mut draft = contact_draft();
        draft.set_fulfillment(FulfillmentType::Delivery);
        draft.set_street(" 1 rue de Fontenay ");
        draft.enter_postal_code(" 94300 ", &zones);
        draft.set_payment_method(PaymentMethod::PayPal);

        let validated = validate(&draft, &zones, false).unwrap();
        assert_eq!(
            validated.fulfillment,
            FulfillmentDetails::Delivery {
                street: "1 rue de Fontenay".to_string(),
                postal_code: "94300".to_string(),
                city: "Vincennes".to_string(),
                time_slot: None,
            }
        );
        assert_eq!(validated.payment_method, PaymentMethod::PayPal);
    }

    #[test]
    fn test_errors_display() {
        let draft = contact_draft();
        let errors = validate(&draft, &ZoneDirectory::default(), false).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "pickup location: Choose a pickup location"
        );
    }
}
