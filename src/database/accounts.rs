use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Account, AccountWithProfiles, AdminProfile, CustomerProfile};
use crate::database::query_count::QueryCounter;

/// Fetches accounts with their sub-profile tables eager-loaded.
///
/// The repository consumes the resolver's eager-load spec and performs one
/// SELECT with a LEFT JOIN per listed relation, so resolution afterwards
/// never needs another round trip. Every statement is recorded on the
/// request's query counter.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one account by id with the listed relations populated.
    pub async fn fetch_with_profiles(
        &self,
        counter: &QueryCounter,
        id: Uuid,
        spec: &[&str],
    ) -> Result<Option<AccountWithProfiles>, DatabaseError> {
        let sql = Self::select_sql(spec, true);
        counter.record();

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| Self::decode_row(&r, spec)).transpose()
    }

    /// Fetch every account with the listed relations populated, in a
    /// single query.
    pub async fn fetch_all_with_profiles(
        &self,
        counter: &QueryCounter,
        spec: &[&str],
    ) -> Result<Vec<AccountWithProfiles>, DatabaseError> {
        let sql = Self::select_sql(spec, false);
        counter.record();

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(|r| Self::decode_row(r, spec)).collect()
    }

    fn select_sql(spec: &[&str], by_id: bool) -> String {
        let mut select =
            String::from("SELECT a.id, a.email, a.is_active, a.created_at, a.updated_at");
        let mut joins = String::new();

        for name in spec {
            match *name {
                AccountWithProfiles::ADMIN => {
                    select.push_str(
                        ", ap.account_id AS admin_account_id, \
                         ap.display_name AS admin_display_name, \
                         ap.superuser AS admin_superuser, \
                         ap.created_at AS admin_created_at, \
                         ap.updated_at AS admin_updated_at",
                    );
                    joins.push_str(" LEFT JOIN admin_profiles ap ON ap.account_id = a.id");
                }
                AccountWithProfiles::CUSTOMER => {
                    select.push_str(
                        ", cp.account_id AS customer_account_id, \
                         cp.display_name AS customer_display_name, \
                         cp.loyalty_points AS customer_loyalty_points, \
                         cp.created_at AS customer_created_at, \
                         cp.updated_at AS customer_updated_at",
                    );
                    joins.push_str(" LEFT JOIN customer_profiles cp ON cp.account_id = a.id");
                }
                other => {
                    tracing::warn!("unknown profile relation '{}' in eager-load spec", other);
                }
            }
        }

        let mut sql = format!("{} FROM accounts a{}", select, joins);
        if by_id {
            sql.push_str(" WHERE a.id = $1");
        } else {
            sql.push_str(" ORDER BY a.created_at");
        }
        sql
    }

    fn decode_row(row: &PgRow, spec: &[&str]) -> Result<AccountWithProfiles, DatabaseError> {
        let account = Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };

        // Joined columns are nullable as a block: a NULL shared pk means
        // the LEFT JOIN found no row.
        let mut admin = None;
        if spec.contains(&AccountWithProfiles::ADMIN) {
            if let Some(account_id) = row.try_get::<Option<Uuid>, _>("admin_account_id")? {
                admin = Some(AdminProfile {
                    account_id,
                    display_name: row.try_get("admin_display_name")?,
                    superuser: row.try_get("admin_superuser")?,
                    created_at: row.try_get("admin_created_at")?,
                    updated_at: row.try_get("admin_updated_at")?,
                });
            }
        }

        let mut customer = None;
        if spec.contains(&AccountWithProfiles::CUSTOMER) {
            if let Some(account_id) = row.try_get::<Option<Uuid>, _>("customer_account_id")? {
                customer = Some(CustomerProfile {
                    account_id,
                    display_name: row.try_get("customer_display_name")?,
                    loyalty_points: row.try_get("customer_loyalty_points")?,
                    created_at: row.try_get("customer_created_at")?,
                    updated_at: row.try_get("customer_updated_at")?,
                });
            }
        }

        Ok(AccountWithProfiles { account, admin, customer })
    }
}
