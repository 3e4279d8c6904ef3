//! Builders for eager-loaded account shapes used across unit tests.

use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Account, AccountWithProfiles, AdminProfile, CustomerProfile};

pub fn account(email: &str) -> AccountWithProfiles {
    let now = Utc::now();
    AccountWithProfiles {
        account: Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        admin: None,
        customer: None,
    }
}

pub fn admin_profile(account_id: Uuid, display_name: &str) -> AdminProfile {
    let now = Utc::now();
    AdminProfile {
        account_id,
        display_name: display_name.to_string(),
        superuser: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn customer_profile(account_id: Uuid, loyalty_points: i32) -> CustomerProfile {
    let now = Utc::now();
    CustomerProfile {
        account_id,
        display_name: "customer".to_string(),
        loyalty_points,
        created_at: now,
        updated_at: now,
    }
}
