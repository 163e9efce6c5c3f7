use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::PageParams;
use crate::models::{ContactType, CreateContact, ListContactsFilter, UpdateContact};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    pub contact_type: ContactType,

    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 50))]
    pub tax_number: Option<String>,

    #[validate(length(max = 50))]
    pub phone: Option<String>,

    pub address: Option<String>,

    #[validate(length(equal = 3, message = "Currency code must have 3 letters"))]
    pub currency_code: String,
}

impl CreateContactRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateContact {
        CreateContact {
            company_id,
            contact_type: self.contact_type,
            name: self.name,
            email: self.email,
            tax_number: self.tax_number,
            phone: self.phone,
            address: self.address,
            currency_code: self.currency_code.to_uppercase(),
        }
    }
}

/// The contact type is fixed; it decides which permission family guards the
/// record.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub tax_number: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(equal = 3))]
    pub currency_code: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateContactRequest> for UpdateContact {
    fn from(req: UpdateContactRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            tax_number: req.tax_number,
            phone: req.phone,
            address: req.address,
            currency_code: req.currency_code.map(|c| c.to_uppercase()),
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListContactsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub contact_type: Option<ContactType>,
    pub search: Option<String>,
}

impl ListContactsParams {
    pub fn split(self) -> (ListContactsFilter, PageParams) {
        (
            ListContactsFilter {
                contact_type: self.contact_type,
                search: self.search.filter(|s| !s.trim().is_empty()),
            },
            PageParams {
                page: self.page,
                page_size: self.page_size,
            },
        )
    }
}
