//! External domains a Sample can reference

use serde::{Deserialize, Serialize};

/// Describes one external domain: where the reference lives on a record,
/// which remote path resolves it and how the response is projected back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentDomain {
    /// Short domain name, also the correlation id prefix (e.g. "account")
    pub name: String,
    /// Reference field on the record (e.g. "account")
    pub field: String,
    /// Key inside the reference holding the foreign id (e.g. "accountID")
    pub key: String,
    /// Single-entity path with an `{id}` placeholder
    pub endpoint: String,
    /// Payload field carrying the display name
    pub name_field: String,
}

impl EnrichmentDomain {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        key: impl Into<String>,
        endpoint: impl Into<String>,
        name_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            key: key.into(),
            endpoint: endpoint.into(),
            name_field: name_field.into(),
        }
    }

    pub fn account() -> Self {
        Self::new(
            "account",
            "account",
            "accountID",
            "/sap/c4c/api/v1/account-service/accounts/{id}",
            "formattedName",
        )
    }

    pub fn product() -> Self {
        Self::new(
            "product",
            "product",
            "productID",
            "/sap/c4c/api/v1/product-service/products/{id}",
            "name",
        )
    }

    pub fn employee() -> Self {
        Self::new(
            "employee",
            "employee",
            "employeeID",
            "/sap/c4c/api/v1/employee-service/employees/{id}",
            "formattedName",
        )
    }

    /// The three built-in domains in their fixed processing order.
    pub fn defaults() -> Vec<Self> {
        vec![Self::account(), Self::product(), Self::employee()]
    }

    /// Sparse field projection requested for every entity.
    pub fn select(&self) -> String {
        format!("displayId,id,{}", self.name_field)
    }

    /// Resolve the endpoint template for one foreign id.
    pub fn path_for(&self, foreign_id: &str) -> String {
        let path = self
            .endpoint
            .replace("{id}", &urlencoding::encode(foreign_id));
        format!("{}?$select={}", path, self.select())
    }

    /// Correlation id of the k-th request of a batch.
    pub fn correlation_id(&self, k: usize) -> String {
        format!("{}_{}", self.name, k)
    }
}
