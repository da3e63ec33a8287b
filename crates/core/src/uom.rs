//! Units of measure for inventory quantities.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Unit of measure for a quantity delta or count.
///
/// Every item has a base UOM; all ledger deltas for an item are expressed in
/// it. Cross-UOM conversion (e.g. grams to oz via bottle tare/density) happens
/// upstream, before values reach the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uom {
    Units,
    Oz,
    Ml,
    Grams,
}

impl Uom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Uom::Units => "units",
            Uom::Oz => "oz",
            Uom::Ml => "ml",
            Uom::Grams => "grams",
        }
    }
}

impl core::fmt::Display for Uom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Uom {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "units" => Ok(Uom::Units),
            "oz" => Ok(Uom::Oz),
            "ml" => Ok(Uom::Ml),
            "grams" => Ok(Uom::Grams),
            other => Err(DomainError::validation(format!(
                "unknown unit of measure '{other}' (expected units, oz, ml or grams)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_uoms() {
        assert_eq!("units".parse::<Uom>().unwrap(), Uom::Units);
        assert_eq!("oz".parse::<Uom>().unwrap(), Uom::Oz);
        assert_eq!("ml".parse::<Uom>().unwrap(), Uom::Ml);
        assert_eq!("grams".parse::<Uom>().unwrap(), Uom::Grams);
    }

    #[test]
    fn rejects_malformed_uom() {
        let err = "gallons".parse::<Uom>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn display_round_trips() {
        for uom in [Uom::Units, Uom::Oz, Uom::Ml, Uom::Grams] {
            assert_eq!(uom.to_string().parse::<Uom>().unwrap(), uom);
        }
    }
}
