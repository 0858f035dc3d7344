//! Strongly-typed record names.
//!
//! Customers, customer groups and companies are addressed by their
//! human-assigned names (e.g. `"Walk-In Customer"`, `"Acme Retail Ltd"`), the
//! same way the back-office ERP keys them.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Upper bound on a record name, matching the ERP's name column width.
pub const MAX_NAME_LEN: usize = 140;

/// Name of a customer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

/// Name of a customer group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerGroupId(String);

/// Name of a company (the accounting entity a limit applies to).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

fn validate_name(raw: &str, kind: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::invalid_id(format!("{kind}: name cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid_id(format!(
            "{kind}: name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(DomainError::invalid_id(format!(
            "{kind}: name contains control characters"
        )));
    }
    Ok(name.to_string())
}

macro_rules! impl_name_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Validate and wrap a record name (surrounding whitespace is trimmed).
            pub fn new(name: impl AsRef<str>) -> Result<Self, DomainError> {
                validate_name(name.as_ref(), $name).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_name_newtype!(CustomerId, "CustomerId");
impl_name_newtype!(CustomerGroupId, "CustomerGroupId");
impl_name_newtype!(CompanyId, "CompanyId");
