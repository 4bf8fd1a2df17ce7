//! Room and building identifiers used by the receiver firmware.
//!
//! The packet carries them as raw bytes. Ids outside these tables are still
//! valid on the wire; [`Room::from_id`] and [`Building::from_id`] return
//! `None` for them and callers keep the raw value.

use std::fmt;

use serde::{Serialize, Serializer};

macro_rules! id_table {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $id:literal => $label:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            /// Every known value, in id order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Look up the firmware id.
            #[must_use]
            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// The byte sent on the wire.
            #[must_use]
            pub fn id(self) -> u8 {
                match self {
                    $(Self::$variant => $id,)*
                }
            }

            /// Name as used in firmware configuration.
            #[must_use]
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

id_table! {
    /// Room a receiver is installed in.
    Room {
        Bedroom = 0 => "BEDROOM",
        LivingRoom = 1 => "LIVING_ROOM",
        Kitchen = 2 => "KITCHEN",
        Bathroom = 3 => "BATHROOM",
        Office = 4 => "OFFICE",
        Hallway = 5 => "HALLWAY",
        Garage = 6 => "GARAGE",
        Basement = 7 => "BASEMENT",
        DiningRoom = 8 => "DINING_ROOM",
        GuestRoom = 9 => "GUEST_ROOM",
        Balcony = 10 => "BALCONY",
        Laundry = 11 => "LAUNDRY",
        Storage = 12 => "STORAGE",
        Entrance = 13 => "ENTRANCE",
        Patio = 14 => "PATIO",
        Unknown = 255 => "UNKNOWN",
    }
}

id_table! {
    /// Building a receiver is installed in.
    Building {
        MainOffice = 0 => "MAIN_OFFICE",
        BuildingA = 1 => "BUILDING_A",
        BuildingB = 2 => "BUILDING_B",
        BuildingC = 3 => "BUILDING_C",
        Warehouse = 4 => "WAREHOUSE",
        Lab = 5 => "LAB",
        Factory = 6 => "FACTORY",
        Residence1 = 7 => "RESIDENCE_1",
        Residence2 = 8 => "RESIDENCE_2",
        Annex = 9 => "ANNEX",
        Unknown = 255 => "UNKNOWN",
    }
}

/// Render a room id, falling back to the number when it is not in the table.
#[must_use]
pub fn describe_room(id: u8) -> String {
    Room::from_id(id).map_or_else(|| format!("room #{id}"), |r| r.to_string())
}

/// Render a building id, falling back to the number when it is not in the table.
#[must_use]
pub fn describe_building(id: u8) -> String {
    Building::from_id(id).map_or_else(|| format!("building #{id}"), |b| b.to_string())
}
