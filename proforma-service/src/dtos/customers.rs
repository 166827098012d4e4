use crate::models::NewCustomer;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub tax_id: Option<String>,
    #[validate(length(max = 200, message = "District must be at most 200 characters"))]
    pub district: Option<String>,
    #[serde(default)]
    pub installation_service: bool,
}

impl From<CreateCustomerRequest> for NewCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            national_id: req.national_id,
            tax_id: req.tax_id,
            district: req.district,
            installation_service: req.installation_service,
        }
    }
}
