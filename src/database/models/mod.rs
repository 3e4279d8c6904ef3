pub mod account;
pub mod profiles;

pub use account::{Account, AccountWithProfiles, SubProfile};
pub use profiles::{AdminProfile, CustomerProfile};
