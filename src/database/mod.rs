pub mod accounts;
pub mod manager;
pub mod models;
pub mod query_count;

pub use accounts::AccountRepository;
pub use manager::{DatabaseError, DatabaseManager};
pub use query_count::QueryCounter;
