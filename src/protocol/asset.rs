/// Fixed-precision token amounts such as `"1.000 STEEM"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Symbols are stored in a 7-byte, zero padded field on the wire.
pub const MAX_SYMBOL_LEN: usize = 7;

/// Largest precision whose scale (`10^precision`) fits in a `u64`
pub const MAX_PRECISION: u8 = 18;

/// Fields are private so every `Asset` has passed the checks in [`Asset::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    amount: i64,
    precision: u8,
    symbol: String,
}

impl Asset {
    pub fn new(amount: i64, precision: u8, symbol: &str) -> Result<Self> {
        if precision > MAX_PRECISION {
            return Err(Error::InvalidAsset(format!(
                "precision {} exceeds {}",
                precision, MAX_PRECISION
            )));
        }
        if symbol.is_empty()
            || symbol.len() > MAX_SYMBOL_LEN
            || !symbol.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(Error::InvalidAsset(format!("bad symbol '{}'", symbol)));
        }
        Ok(Asset { amount, precision, symbol: symbol.to_string() })
    }

    pub fn steem(amount: i64) -> Self {
        Asset { amount, precision: 3, symbol: "STEEM".into() }
    }

    pub fn sbd(amount: i64) -> Self {
        Asset { amount, precision: 3, symbol: "SBD".into() }
    }

    /// Amount in the smallest unit (`1.000 STEEM` is 1000)
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Graphene binary layout: amount (i64 LE), precision (u8), symbol padded to 7 bytes.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.amount.to_le_bytes());
        out[8] = self.precision;
        out[9..9 + self.symbol.len()].copy_from_slice(self.symbol.as_bytes());
        out
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        if self.precision == 0 {
            return write!(f, "{}{} {}", sign, abs, self.symbol);
        }
        let scale = 10u64.pow(self.precision as u32);
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / scale,
            abs % scale,
            self.symbol,
            width = self.precision as usize
        )
    }
}

impl FromStr for Asset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (number, symbol) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::InvalidAsset(format!("missing symbol in '{}'", s)))?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };

        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidAsset(format!("bad amount '{}'", number)));
        }

        let precision = u8::try_from(fraction.len())
            .map_err(|_| Error::InvalidAsset(format!("precision too large in '{}'", s)))?;
        let amount: i64 = format!("{}{}", whole, fraction)
            .parse()
            .map_err(|_| Error::InvalidAsset(format!("amount out of range in '{}'", s)))?;

        Asset::new(if negative { -amount } else { amount }, precision, symbol.trim())
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
