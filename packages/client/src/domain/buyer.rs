//! Buyer identity used by the purchase flow.

use super::{error::DomainError, value_object::NationalId};

/// Verified buyer identity. Purchases are disabled until one is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub first_name: String,
    pub last_name: String,
    pub national_id: NationalId,
}

impl Buyer {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();
        if first_name.is_empty() {
            return Err(DomainError::BlankName("first name"));
        }
        if last_name.is_empty() {
            return Err(DomainError::BlankName("last name"));
        }
        Ok(Self {
            first_name,
            last_name,
            national_id: NationalId::new(national_id)?,
        })
    }
}
