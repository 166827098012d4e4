use crate::domain::validation;
use crate::models::{Customer, NewCustomer};
use crate::services::error::SalesError;
use crate::services::store::StoreGateway;
use tracing::{info, instrument};

/// Registration and lookup of shop customers.
#[derive(Clone)]
pub struct CustomerDirectory {
    gateway: StoreGateway,
}

impl CustomerDirectory {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewCustomer) -> Result<Customer, SalesError> {
        let input = input.normalized();
        validation::validate_customer(&input)?;

        let customer = self
            .gateway
            .write("insert_customer", self.gateway.store().insert_customer(&input))
            .await?;

        info!(
            customer_id = %customer.customer_id,
            installation_service = customer.installation_service,
            "Customer registered"
        );
        Ok(customer)
    }

    /// All customers ordered by name.
    pub async fn list(&self) -> Result<Vec<Customer>, SalesError> {
        let store = self.gateway.store();
        Ok(self
            .gateway
            .read("list_customers", || store.list_customers())
            .await?)
    }
}
