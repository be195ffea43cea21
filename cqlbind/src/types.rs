use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use scylla::statement::Consistency;

use crate::errors::SchemaError;

/// Replica acknowledgement policy, numbered the way the CQL protocol numbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Any,
    #[default]
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl ConsistencyLevel {
    pub fn from_code(code: u16) -> Result<Self, SchemaError> {
        let level = match code {
            0 => ConsistencyLevel::Any,
            1 => ConsistencyLevel::One,
            2 => ConsistencyLevel::Two,
            3 => ConsistencyLevel::Three,
            4 => ConsistencyLevel::Quorum,
            5 => ConsistencyLevel::All,
            6 => ConsistencyLevel::LocalQuorum,
            7 => ConsistencyLevel::EachQuorum,
            8 => ConsistencyLevel::Serial,
            9 => ConsistencyLevel::LocalSerial,
            10 => ConsistencyLevel::LocalOne,
            other => {
                return Err(SchemaError::ConfigError(format!(
                    "unknown consistency level code {}",
                    other
                )))
            }
        };
        Ok(level)
    }

    pub fn code(self) -> u16 {
        match self {
            ConsistencyLevel::Any => 0,
            ConsistencyLevel::One => 1,
            ConsistencyLevel::Two => 2,
            ConsistencyLevel::Three => 3,
            ConsistencyLevel::Quorum => 4,
            ConsistencyLevel::All => 5,
            ConsistencyLevel::LocalQuorum => 6,
            ConsistencyLevel::EachQuorum => 7,
            ConsistencyLevel::Serial => 8,
            ConsistencyLevel::LocalSerial => 9,
            ConsistencyLevel::LocalOne => 10,
        }
    }
}

impl FromStr for ConsistencyLevel {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "ALL" => Ok(ConsistencyLevel::All),
            "LOCAL_QUORUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "SERIAL" => Ok(ConsistencyLevel::Serial),
            "LOCAL_SERIAL" => Ok(ConsistencyLevel::LocalSerial),
            "LOCAL_ONE" => Ok(ConsistencyLevel::LocalOne),
            _ => match normalized.parse::<u16>() {
                Ok(code) => ConsistencyLevel::from_code(code),
                Err(_) => Err(SchemaError::ConfigError(format!(
                    "unknown consistency level '{}'",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::Serial => "SERIAL",
            ConsistencyLevel::LocalSerial => "LOCAL_SERIAL",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
        };
        f.write_str(name)
    }
}

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::Serial => Consistency::Serial,
            ConsistencyLevel::LocalSerial => Consistency::LocalSerial,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_protocol_numbering() {
        for code in 0..=10 {
            let level = ConsistencyLevel::from_code(code).unwrap();
            assert_eq!(level.code(), code);
        }
        assert!(ConsistencyLevel::from_code(11).is_err());
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("quorum".parse::<ConsistencyLevel>().unwrap(), ConsistencyLevel::Quorum);
        assert_eq!("local-one".parse::<ConsistencyLevel>().unwrap(), ConsistencyLevel::LocalOne);
        assert_eq!("6".parse::<ConsistencyLevel>().unwrap(), ConsistencyLevel::LocalQuorum);
        assert!("sometimes".parse::<ConsistencyLevel>().is_err());
    }

    #[test]
    fn test_default_is_one() {
        assert_eq!(ConsistencyLevel::default(), ConsistencyLevel::One);
        assert_eq!(ConsistencyLevel::default().to_string(), "ONE");
    }
}
