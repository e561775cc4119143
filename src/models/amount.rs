use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Smallest-unit token amount (wei).
///
/// Serialized as a decimal string so values above 2^53 survive JSON
/// round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(BigUint);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAmountError(pub String);

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount: {}", self.0)
    }
}

impl std::error::Error for ParseAmountError {}

impl Amount {
    pub fn zero() -> Self {
        Amount(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Multiply by a count (reward per response x max responses).
    pub fn times(&self, count: u64) -> Amount {
        Amount(&self.0 * BigUint::from(count))
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 >= other.0 {
            Some(Amount(&self.0 - &other.0))
        } else {
            None
        }
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_default()
    }
}

impl std::ops::Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(BigUint::from(v))
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Amount(BigUint::from(v))
    }
}

impl From<BigUint> for Amount {
    fn from(v: BigUint) -> Self {
        Amount(v)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts plain ASCII decimal digits only: no sign, no exponent, no separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseAmountError(s.to_string()));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Amount)
            .ok_or_else(|| ParseAmountError(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
