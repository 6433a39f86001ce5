//! Vehicle class enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle class a driver operates and a rider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Auto,
    Mini,
    Sedan,
    Suv,
}

impl VehicleClass {
    /// String representation used in database rows and Redis keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Auto => "auto",
            VehicleClass::Mini => "mini",
            VehicleClass::Sedan => "sedan",
            VehicleClass::Suv => "suv",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VehicleClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(VehicleClass::Auto),
            "mini" => Ok(VehicleClass::Mini),
            "sedan" => Ok(VehicleClass::Sedan),
            "suv" => Ok(VehicleClass::Suv),
            _ => Err(format!(
                "Invalid vehicle class: {s}. Must be one of: auto, mini, sedan, suv"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for v in [VehicleClass::Auto, VehicleClass::Mini, VehicleClass::Sedan, VehicleClass::Suv] {
            assert_eq!(v.as_str().parse::<VehicleClass>().unwrap(), v);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&VehicleClass::Suv).unwrap(), "\"suv\"");
        let parsed: VehicleClass = serde_json::from_str("\"sedan\"").unwrap();
        assert_eq!(parsed, VehicleClass::Sedan);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("bike".parse::<VehicleClass>().is_err());
        assert!("MINI".parse::<VehicleClass>().is_err());
    }
}
