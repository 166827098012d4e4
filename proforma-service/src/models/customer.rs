//! Customer model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A shop customer. Created once, never edited in-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub customer_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub tax_id: Option<String>,
    pub district: Option<String>,
    pub installation_service: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for registering a customer. Optional text fields are normalised by
/// [`NewCustomer::normalized`] before validation: trimmed, and blank becomes `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub tax_id: Option<String>,
    pub district: Option<String>,
    pub installation_service: bool,
}

impl NewCustomer {
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            phone: clean(self.phone),
            national_id: clean(self.national_id),
            tax_id: clean(self.tax_id),
            district: clean(self.district),
            installation_service: self.installation_service,
        }
    }
}
