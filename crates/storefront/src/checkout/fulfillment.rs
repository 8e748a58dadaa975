//! Pickup locations, delivery time slots and the fulfillment sum type.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use verger_core::FulfillmentType;

/// Shops offering in-store pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickupLocation {
    VincennesCentre,
    SaintMande,
    Montreuil,
}

impl PickupLocation {
    /// All pickup locations, in display order.
    pub const ALL: [Self; 3] = [Self::VincennesCentre, Self::SaintMande, Self::Montreuil];

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::VincennesCentre => "vincennes-centre",
            Self::SaintMande => "saint-mande",
            Self::Montreuil => "montreuil",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::VincennesCentre => "Vincennes Centre, 21 rue du Midi",
            Self::SaintMande => "Saint-Mandé, 4 avenue Gambetta",
            Self::Montreuil => "Montreuil, 9 rue de Paris",
        }
    }
}

impl fmt::Display for PickupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PickupLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|location| location.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pickup location: {s}"))
    }
}

/// Delivery windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [Self; 3] = [Self::Morning, Self::Afternoon, Self::Evening];

    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    #[must_use]
    pub const fn window(&self) -> &'static str {
        match self {
            Self::Morning => "09:00-12:00",
            Self::Afternoon => "14:00-17:00",
            Self::Evening => "18:00-20:00",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.window())
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown time slot: {s}"))
    }
}

/// How a validated order reaches the customer.
///
/// Only built by validation, so a delivery always targets a served postal
/// code and a pickup always names a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FulfillmentDetails {
    /// Pickup in store.
    Store { pickup_location: PickupLocation },
    /// Home delivery inside a delivery zone.
    Delivery {
        street: String,
        postal_code: String,
        city: String,
        #[serde(default)]
        time_slot: Option<TimeSlot>,
    },
}

impl FulfillmentDetails {
    #[must_use]
    pub const fn kind(&self) -> FulfillmentType {
        match self {
            Self::Store { .. } => FulfillmentType::Store,
            Self::Delivery { .. } => FulfillmentType::Delivery,
        }
    }
}

impl fmt::Display for FulfillmentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { pickup_location } => write!(f, "Pickup at {pickup_location}"),
            Self::Delivery {
                street,
                postal_code,
                city,
                time_slot,
            } => {
                write!(f, "Delivery to {street}, {postal_code} {city}")?;
                if let Some(slot) = time_slot {
                    write!(f, " ({slot})")?;
                }
                Ok(())
            }
        }
    }
}
