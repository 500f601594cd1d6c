use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            unknown => Err(format!("unknown gender {unknown:?}")),
        }
    }
}

/// Participant attributes collected on the welcome screen. Construction
/// validates, so a `Participant` value is always within bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub age: u32,
    pub gender: Gender,
}

impl Participant {
    pub const MIN_AGE: u32 = 1;
    pub const MAX_AGE: u32 = 120;

    pub fn new(age: u32, gender: Gender) -> Result<Self> {
        if !(Self::MIN_AGE..=Self::MAX_AGE).contains(&age) {
            return Err(Error::InvalidParticipant(format!(
                "age must be within {}-{}, got {age}",
                Self::MIN_AGE,
                Self::MAX_AGE
            )));
        }
        Ok(Self { age, gender })
    }

    /// Parse raw form input. Age must parse as an integer in [1, 120] and
    /// gender must come from the accepted set.
    pub fn parse(age: &str, gender: &str) -> Result<Self> {
        let age: u32 = age.trim().parse().map_err(|_| {
            Error::InvalidParticipant(format!("age must be an integer, got {age:?}"))
        })?;
        let gender = Gender::from_str(gender).map_err(Error::InvalidParticipant)?;
        Self::new(age, gender)
    }
}
