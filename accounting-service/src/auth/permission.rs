//! Closed sets of roles and permissions carried in the access token.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Employee,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

macro_rules! permissions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Permission {
            $(#[serde(rename = $name)] $variant),+
        }

        impl Permission {
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $name),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($name => Some(Permission::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

permissions! {
    ReadAuthUsers => "read-auth-users",
    CreateAuthUsers => "create-auth-users",
    UpdateAuthUsers => "update-auth-users",
    DeleteAuthUsers => "delete-auth-users",

    ReadBankingAccounts => "read-banking-accounts",
    CreateBankingAccounts => "create-banking-accounts",
    UpdateBankingAccounts => "update-banking-accounts",
    DeleteBankingAccounts => "delete-banking-accounts",

    ReadBankingTransactions => "read-banking-transactions",
    CreateBankingTransactions => "create-banking-transactions",
    UpdateBankingTransactions => "update-banking-transactions",
    DeleteBankingTransactions => "delete-banking-transactions",

    ReadSalesInvoices => "read-sales-invoices",
    CreateSalesInvoices => "create-sales-invoices",
    UpdateSalesInvoices => "update-sales-invoices",
    DeleteSalesInvoices => "delete-sales-invoices",

    ReadSalesCustomers => "read-sales-customers",
    CreateSalesCustomers => "create-sales-customers",
    UpdateSalesCustomers => "update-sales-customers",
    DeleteSalesCustomers => "delete-sales-customers",

    ReadPurchasesBills => "read-purchases-bills",
    CreatePurchasesBills => "create-purchases-bills",
    UpdatePurchasesBills => "update-purchases-bills",
    DeletePurchasesBills => "delete-purchases-bills",

    ReadPurchasesVendors => "read-purchases-vendors",
    CreatePurchasesVendors => "create-purchases-vendors",
    UpdatePurchasesVendors => "update-purchases-vendors",
    DeletePurchasesVendors => "delete-purchases-vendors",

    ReadItems => "read-items",
    CreateItems => "create-items",
    UpdateItems => "update-items",
    DeleteItems => "delete-items",

    ReadReports => "read-reports",
    CreateReports => "create-reports",

    ReadSettings => "read-settings",
    UpdateSettings => "update-settings",
}

/// CRUD verb, used to pick the permission for resources whose permission
/// family depends on the record (documents, contacts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Create,
    Update,
    Delete,
}

impl Access {
    pub fn documents(self, receivable: bool) -> Permission {
        match (receivable, self) {
            (true, Access::Read) => Permission::ReadSalesInvoices,
            (true, Access::Create) => Permission::CreateSalesInvoices,
            (true, Access::Update) => Permission::UpdateSalesInvoices,
            (true, Access::Delete) => Permission::DeleteSalesInvoices,
            (false, Access::Read) => Permission::ReadPurchasesBills,
            (false, Access::Create) => Permission::CreatePurchasesBills,
            (false, Access::Update) => Permission::UpdatePurchasesBills,
            (false, Access::Delete) => Permission::DeletePurchasesBills,
        }
    }

    /// Customers sit under sales; vendors and employees under purchases.
    pub fn contacts(self, customer: bool) -> Permission {
        match (customer, self) {
            (true, Access::Read) => Permission::ReadSalesCustomers,
            (true, Access::Create) => Permission::CreateSalesCustomers,
            (true, Access::Update) => Permission::UpdateSalesCustomers,
            (true, Access::Delete) => Permission::DeleteSalesCustomers,
            (false, Access::Read) => Permission::ReadPurchasesVendors,
            (false, Access::Create) => Permission::CreatePurchasesVendors,
            (false, Access::Update) => Permission::UpdatePurchasesVendors,
            (false, Access::Delete) => Permission::DeletePurchasesVendors,
        }
    }

    /// Currencies, categories and taxes are company settings.
    pub fn settings(self) -> Permission {
        match self {
            Access::Read => Permission::ReadSettings,
            _ => Permission::UpdateSettings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_permission_parses_back() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.as_str()), Some(*permission));
        }
        assert_eq!(Permission::ALL.len(), 36);
    }

    #[test]
    fn unknown_strings_do_not_parse() {
        assert_eq!(Permission::parse("READ-ITEMS"), None);
        assert_eq!(Permission::parse("read-items "), None);
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn permission_families() {
        assert_eq!(Access::Create.documents(true), Permission::CreateSalesInvoices);
        assert_eq!(Access::Read.documents(false), Permission::ReadPurchasesBills);
        assert_eq!(Access::Delete.contacts(false), Permission::DeletePurchasesVendors);
        assert_eq!(Access::Delete.settings(), Permission::UpdateSettings);
    }
}
