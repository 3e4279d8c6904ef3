use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::models::profiles::{AdminProfile, CustomerProfile};
use crate::profile::ProfileRelation;

/// Root identity row. Never subtyped at the storage level; specializations
/// live in their own tables keyed by account_id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An account with its sub-profile rows populated by a single
/// eager-loading fetch. This is the only shape the resolver accepts;
/// relations outside the fetch's eager-load spec stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountWithProfiles {
    pub account: Account,
    pub admin: Option<AdminProfile>,
    pub customer: Option<CustomerProfile>,
}

/// Tagged variant over this deployment's sub-profile tables.
#[derive(Debug, Clone, Serialize)]
pub enum SubProfile {
    Admin(AdminProfile),
    Customer(CustomerProfile),
}

impl AccountWithProfiles {
    pub const ADMIN: &'static str = "admin";
    pub const CUSTOMER: &'static str = "customer";

    /// The relation table handed to `ProfileResolver::new`: one entry per
    /// sub-profile table, each reading an already-loaded relation.
    pub fn relation_table() -> Vec<ProfileRelation<AccountWithProfiles, SubProfile>> {
        vec![
            ProfileRelation::new(Self::ADMIN, |a| a.admin.clone().map(SubProfile::Admin)),
            ProfileRelation::new(Self::CUSTOMER, |a| {
                a.customer.clone().map(SubProfile::Customer)
            }),
        ]
    }
}
