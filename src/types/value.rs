//! Literal values carried in action arguments and results.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::{Error, ErrorKind, Result};

/// A 20-byte account or contract address, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != 40 {
            return Err(Error {
                kind: ErrorKind::InvalidValue,
                msg: format!("address must be 40 hex digits: {s}"),
            });
        }
        let mut out = [0u8; 20];
        hex::decode_to_slice(body, &mut out).map_err(|e| Error {
            kind: ErrorKind::InvalidValue,
            msg: format!("invalid address {s}: {e}"),
        })?;
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unsigned token quantity in base units (e.g. wei for 18-decimal tokens).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Debug)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Parse a decimal token quantity and scale it to base units, like `parseEther`.
    ///
    /// `"69000000"` with 18 decimals yields `69_000_000 * 10^18`. Fractional digits beyond
    /// `decimals` are rejected rather than truncated.
    ///
    /// # Errors
    ///
    /// Returns an error for signs, non-digits, excess precision, or overflow.
    pub fn parse_units(s: &str, decimals: u32) -> Result<Self> {
        let invalid = |msg: String| Error {
            kind: ErrorKind::InvalidValue,
            msg,
        };
        let s = s.trim().replace('_', "");
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w.to_string(), f.to_string()),
            None => (s.clone(), String::new()),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount".to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid(format!("amount must be an unsigned decimal: {s}")));
        }
        if frac.len() > decimals as usize {
            return Err(invalid(format!(
                "amount {s} has more than {decimals} fractional digits"
            )));
        }
        let scale = 10u128
            .checked_pow(decimals)
            .ok_or_else(|| invalid(format!("decimals too large: {decimals}")))?;
        let whole_v: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| invalid(format!("amount overflows: {s}")))?
        };
        let mut frac_padded = frac;
        while frac_padded.len() < decimals as usize {
            frac_padded.push('0');
        }
        let frac_v: u128 = if frac_padded.is_empty() {
            0
        } else {
            frac_padded
                .parse()
                .map_err(|_| invalid(format!("amount overflows: {s}")))?
        };
        whole_v
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_v))
            .map(Amount)
            .ok_or_else(|| invalid(format!("amount overflows: {s}")))
    }

    /// Whole-token quantity scaled to base units.
    #[must_use]
    pub fn tokens(whole: u128, decimals: u32) -> Self {
        Amount(whole.saturating_mul(10u128.saturating_pow(decimals)))
    }

    #[must_use]
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    #[must_use]
    pub fn abs_diff(self, other: Amount) -> Amount {
        Amount(self.0.abs_diff(other.0))
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Render base units as a decimal token quantity, trimming trailing zeros.
    #[must_use]
    pub fn format_units(&self, decimals: u32) -> String {
        let scale = 10u128.saturating_pow(decimals);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_s = format!("{frac:0width$}", width = decimals as usize);
        format!("{whole}.{}", frac_s.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        dec_str::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        dec_str::deserialize(d).map(Amount)
    }
}

/// u128 as a decimal string; JSON consumers lose precision on large numbers.
pub(crate) mod dec_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let s = String::deserialize(d)?;
        s.trim().replace('_', "").parse().map_err(serde::de::Error::custom)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&format_args!("0x{}", hex::encode(v)))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// A concrete argument or result value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Address(Address),
    Uint(#[serde(with = "dec_str")] u128),
    Bool(bool),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    Str(String),
}

impl Value {
    #[must_use]
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_uint(&self) -> Option<u128> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short type label used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Address(_) => "address",
            Value::Uint(_) => "uint",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Address(a) => write!(f, "{a}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<Amount> for Value {
    fn from(a: Amount) -> Self {
        Value::Uint(a.0)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrips_through_display() {
        let s = "0x853d1955482e01b50d687fe6ce222114538bdd9c";
        let a: Address = "0x853D1955482E01b50d687fE6ce222114538BDD9C".parse().unwrap();
        assert_eq!(a.to_string(), s);
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz3d1955482e01b50d687fe6ce222114538bdd9c"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn parse_units_scales_like_parse_ether() {
        assert_eq!(
            Amount::parse_units("69000000", 18).unwrap(),
            Amount(69_000_000 * 10u128.pow(18))
        );
        assert_eq!(Amount::parse_units("1.5", 2).unwrap(), Amount(150));
        assert_eq!(Amount::parse_units("0.01", 2).unwrap(), Amount(1));
        assert!(Amount::parse_units("-1", 18).is_err());
        assert!(Amount::parse_units("1.234", 2).is_err());
        assert!(Amount::parse_units("", 18).is_err());
    }

    #[test]
    fn format_units_trims_fraction() {
        assert_eq!(Amount(150).format_units(2), "1.5");
        assert_eq!(Amount::tokens(462_300_000, 18).format_units(18), "462300000");
    }

    #[test]
    fn uint_values_serialize_as_decimal_strings() {
        let v = Value::Uint(690_000_000 * 10u128.pow(18));
        let j = serde_json::to_string(&v).unwrap();
        assert_eq!(j, r#"{"uint":"690000000000000000000000000"}"#);
        let back: Value = serde_json::from_str(&j).unwrap();
        assert_eq!(back, v);
    }
}
