//! Structured identity names with a canonical string form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error raised when a party name string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartyNameError {
    #[error("party name is empty")]
    Empty,
    #[error("party name attribute '{0}' is not recognised")]
    UnknownAttribute(String),
    #[error("party name attribute '{0}' appears more than once")]
    DuplicateAttribute(String),
    #[error("party name is missing mandatory attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("'{0}' is not a two-letter country code")]
    BadCountry(String),
}

/// X.500-style hierarchical identity of a party known to the backend node.
///
/// Organisation, locality and country are mandatory; common name,
/// organisational unit and state are optional. The canonical rendering
/// lists attributes in `CN, OU, O, L, ST, C` order separated by `", "`,
/// e.g. `O=Bank, L=London, C=GB`. Parsing accepts arbitrary spacing around
/// separators and round-trips to an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartyName {
    pub common_name: Option<String>,
    pub organisation_unit: Option<String>,
    pub organisation: String,
    pub locality: String,
    pub state: Option<String>,
    pub country: String,
}

impl PartyName {
    /// Parse a comma-separated list of `KEY=value` attributes.
    pub fn parse(text: &str) -> Result<Self, PartyNameError> {
        if text.trim().is_empty() {
            return Err(PartyNameError::Empty);
        }

        let mut common_name = None;
        let mut organisation_unit = None;
        let mut organisation = None;
        let mut locality = None;
        let mut state = None;
        let mut country = None;

        for part in text.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| PartyNameError::UnknownAttribute(part.trim().to_string()))?;
            let key = key.trim();
            let value = value.trim().to_string();

            let slot = match key {
                "CN" => &mut common_name,
                "OU" => &mut organisation_unit,
                "O" => &mut organisation,
                "L" => &mut locality,
                "ST" => &mut state,
                "C" => &mut country,
                other => return Err(PartyNameError::UnknownAttribute(other.to_string())),
            };
            if slot.is_some() {
                return Err(PartyNameError::DuplicateAttribute(key.to_string()));
            }
            *slot = Some(value);
        }

        let country = country.ok_or(PartyNameError::MissingAttribute("C"))?;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(PartyNameError::BadCountry(country));
        }

        Ok(Self {
            common_name,
            organisation_unit,
            organisation: organisation.ok_or(PartyNameError::MissingAttribute("O"))?,
            locality: locality.ok_or(PartyNameError::MissingAttribute("L"))?,
            state,
            country,
        })
    }
}

impl fmt::Display for PartyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes = Vec::with_capacity(6);
        if let Some(cn) = &self.common_name {
            attributes.push(format!("CN={cn}"));
        }
        if let Some(ou) = &self.organisation_unit {
            attributes.push(format!("OU={ou}"));
        }
        attributes.push(format!("O={}", self.organisation));
        attributes.push(format!("L={}", self.locality));
        if let Some(st) = &self.state {
            attributes.push(format!("ST={st}"));
        }
        attributes.push(format!("C={}", self.country));
        f.write_str(&attributes.join(", "))
    }
}

impl FromStr for PartyName {
    type Err = PartyNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
