//! Vehicle identifier and equipment metadata types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Error returned when parsing an invalid vehicle code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vehicle code: {reason}")]
pub struct InvalidVehicleCode {
    reason: &'static str,
}

/// A validated ZTM vehicle code.
///
/// The vehicle database keys vehicles by a numeric code, but the
/// departures feed delivers the same code sometimes as a JSON number and
/// sometimes as a string. This type stores the canonical decimal string
/// form and deserializes from either wire shape, so a code stored from one
/// feed is always found when queried via the other.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VehicleCode(String);

impl VehicleCode {
    /// Parse a vehicle code from a string.
    ///
    /// The input must be a non-empty sequence of ASCII digits.
    pub fn parse(s: &str) -> Result<Self, InvalidVehicleCode> {
        if s.is_empty() {
            return Err(InvalidVehicleCode {
                reason: "must not be empty",
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidVehicleCode {
                reason: "must contain only ASCII digits",
            });
        }
        Ok(VehicleCode(s.to_string()))
    }

    /// Build a vehicle code from the numeric form.
    pub fn from_number(n: i64) -> Self {
        VehicleCode(n.to_string())
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VehicleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VehicleCode({})", self.0)
    }
}

impl fmt::Display for VehicleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VehicleCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept both the number and string wire shapes.
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => {
                let n = n
                    .as_i64()
                    .ok_or_else(|| serde::de::Error::custom("vehicle code is not an integer"))?;
                Ok(VehicleCode::from_number(n))
            }
            serde_json::Value::String(s) => {
                VehicleCode::parse(&s).map_err(serde::de::Error::custom)
            }
            other => Err(serde::de::Error::custom(format!(
                "vehicle code must be a number or string, got {other}"
            ))),
        }
    }
}

/// Static equipment metadata for one vehicle.
///
/// The default value means "equipment unknown": every flag false, no bike
/// holders. Lookups for unknown vehicles degrade to this value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleRecord {
    pub wheelchair_accessible: bool,
    pub low_floor: bool,
    pub air_conditioning: bool,
    pub usb_chargers: bool,
    pub bike_holders: u32,
    pub kneeling_mechanism: bool,
    pub brand: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_codes() {
        assert!(VehicleCode::parse("2746").is_ok());
        assert!(VehicleCode::parse("1").is_ok());
    }

    #[test]
    fn reject_invalid_codes() {
        assert!(VehicleCode::parse("").is_err());
        assert!(VehicleCode::parse("27a6").is_err());
        assert!(VehicleCode::parse(" 2746").is_err());
    }

    #[test]
    fn number_and_string_forms_agree() {
        assert_eq!(
            VehicleCode::from_number(2746),
            VehicleCode::parse("2746").unwrap()
        );
    }

    #[test]
    fn deserializes_from_json_number() {
        let code: VehicleCode = serde_json::from_str("2746").unwrap();
        assert_eq!(code, VehicleCode::parse("2746").unwrap());
    }

    #[test]
    fn deserializes_from_json_string() {
        let code: VehicleCode = serde_json::from_str("\"2746\"").unwrap();
        assert_eq!(code, VehicleCode::from_number(2746));
    }

    #[test]
    fn rejects_other_json_shapes() {
        assert!(serde_json::from_str::<VehicleCode>("true").is_err());
        assert!(serde_json::from_str::<VehicleCode>("2.5").is_err());
        assert!(serde_json::from_str::<VehicleCode>("[2746]").is_err());
    }

    #[test]
    fn default_record_is_unknown_equipment() {
        let rec = VehicleRecord::default();
        assert!(!rec.wheelchair_accessible);
        assert!(!rec.low_floor);
        assert_eq!(rec.bike_holders, 0);
        assert!(rec.brand.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Both wire shapes deserialize to the same canonical code
        #[test]
        fn wire_shapes_agree(n in 0i64..=999_999) {
            let from_number: VehicleCode = serde_json::from_str(&n.to_string()).unwrap();
            let from_string: VehicleCode = serde_json::from_str(&format!("\"{n}\"")).unwrap();
            prop_assert_eq!(from_number, from_string);
        }

        /// Anything containing a non-digit is rejected
        #[test]
        fn non_digits_rejected(s in ".*[^0-9].*") {
            prop_assert!(VehicleCode::parse(&s).is_err());
        }
    }
}
