//! Key types used throughout the model.
//!
//! Municipalities are identified by their AGS code, grid elements by
//! numeric ids. The token enums (`Sector`, `Carrier`, `VoltageLevel`)
//! carry the exact strings used by the label grammar, so their wire
//! format is part of the aggregation contract.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, RfResult};

/// German municipality identifier (AGS), the primary municipality key.
///
/// Stored as its digit string, e.g. `"15001000"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ags(String);

impl Ags {
    /// Create an AGS from a digit string. Rejects empty and non-digit input.
    pub fn new(code: impl Into<String>) -> RfResult<Self> {
        let code = code.into();
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAgs { code });
        }
        Ok(Ags(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Ags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ags({})", self.0)
    }
}

impl fmt::Display for Ags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! u32_id {
    ($name:ident) => {
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

u32_id!(BusId);
u32_id!(LineId);
u32_id!(TrafoId);

/// Demand sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    /// Households.
    Hh,
    /// Retail, commerce and agriculture.
    Rca,
    /// Industry.
    Ind,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::Hh, Sector::Rca, Sector::Ind];

    pub fn token(self) -> &'static str {
        match self {
            Sector::Hh => "hh",
            Sector::Rca => "rca",
            Sector::Ind => "ind",
        }
    }

    pub fn from_token(token: &str) -> RfResult<Self> {
        match token {
            "hh" => Ok(Sector::Hh),
            "rca" => Ok(Sector::Rca),
            "ind" => Ok(Sector::Ind),
            _ => Err(CoreError::UnknownToken {
                what: "sector",
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Energy carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    El,
    Th,
}

impl Carrier {
    pub fn token(self) -> &'static str {
        match self {
            Carrier::El => "el",
            Carrier::Th => "th",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Voltage level of a boundary bus, used to split the external-grid
/// excess/shortage pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoltageLevel {
    /// High voltage (110 kV).
    Hv,
    /// Extra-high voltage (220 kV and above).
    Ehv,
}

impl VoltageLevel {
    /// Nominal voltages at or above this threshold count as extra-high.
    pub const EHV_THRESHOLD_KV: f64 = 220.0;

    pub fn from_nominal_kv(v_nom_kv: f64) -> Self {
        if v_nom_kv >= Self::EHV_THRESHOLD_KV {
            VoltageLevel::Ehv
        } else {
            VoltageLevel::Hv
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            VoltageLevel::Hv => "hv",
            VoltageLevel::Ehv => "ehv",
        }
    }

    pub fn from_token(token: &str) -> RfResult<Self> {
        match token {
            "hv" => Ok(VoltageLevel::Hv),
            "ehv" => Ok(VoltageLevel::Ehv),
            _ => Err(CoreError::UnknownToken {
                what: "voltage level",
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for VoltageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ags_accepts_digits_only() {
        assert!(Ags::new("15001000").is_ok());
        assert!(Ags::new("").is_err());
        assert!(Ags::new("15a01").is_err());
    }

    #[test]
    fn sector_token_round_trip() {
        for sector in Sector::ALL {
            assert_eq!(Sector::from_token(sector.token()).unwrap(), sector);
        }
    }

    #[test]
    fn voltage_level_from_nominal() {
        assert_eq!(VoltageLevel::from_nominal_kv(110.0), VoltageLevel::Hv);
        assert_eq!(VoltageLevel::from_nominal_kv(220.0), VoltageLevel::Ehv);
        assert_eq!(VoltageLevel::from_nominal_kv(380.0), VoltageLevel::Ehv);
    }
}
