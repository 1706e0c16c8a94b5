// ── Sites and their canonical identity ──
//
// `SiteKey` is shared with the favorites backend and must be derived
// bit-for-bit the same way on both sides. Any drift here silently creates
// duplicate favorites.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A point of interest from the static catalog.
///
/// Serialized in the camelCase shape the renderer and backend expect.
/// Catalog files that spell coordinates `latitude`/`longitude` are
/// accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
}

impl Site {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            lat,
            lng,
            address: None,
            opening_hours: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Canonical identity: the explicit id when present, otherwise
    /// `"<name>|<lat:.6>,<lng:.6>"`.
    pub fn key(&self) -> SiteKey {
        match &self.id {
            Some(id) => SiteKey(id.clone()),
            None => SiteKey::derive(&self.name, self.lat, self.lng),
        }
    }
}

/// Canonical identity string for a [`Site`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteKey(String);

impl SiteKey {
    /// Derive the coordinate-based key.
    ///
    /// Coordinates are printed the way the backend's `toFixed(6)` prints
    /// them: exact halves round away from zero and negative zero loses its
    /// sign.
    pub fn derive(name: &str, lat: f64, lng: f64) -> Self {
        Self(format!("{name}|{},{}", to_fixed6(lat), to_fixed6(lng)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Six-decimal fixed-point text with `toFixed` tie breaking.
///
/// `{:.6}` already rounds the exact binary value correctly except on an
/// exact tie, where it picks the even digit. A tie needs a seventh decimal
/// of 5 and nothing after it, which only a multiple of 1/128 can have; for
/// those the seven-decimal text is exact.
#[allow(clippy::float_cmp)]
fn to_fixed6(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if (value * 128.0).fract() == 0.0 {
        let exact = format!("{value:.7}");
        if let Some(truncated) = exact.strip_suffix('5') {
            return bump_last_digit(truncated);
        }
    }
    format!("{value:.6}")
}

/// Add one unit in the last place of a decimal string, away from zero.
fn bump_last_digit(digits: &str) -> String {
    let mut chars: Vec<char> = digits.chars().collect();
    for c in chars.iter_mut().rev() {
        match c.to_digit(10) {
            Some(9) => *c = '0',
            Some(d) => {
                *c = char::from_digit(d + 1, 10).unwrap_or('0');
                return chars.into_iter().collect();
            }
            None => {}
        }
    }
    // Carried out of the leading digit, e.g. 9.9999995 -> 10.000000.
    let at = usize::from(chars.first() == Some(&'-'));
    chars.insert(at, '1');
    chars.into_iter().collect()
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SiteKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for SiteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
