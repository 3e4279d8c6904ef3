use std::collections::HashSet;

use super::config::{ProfileConfig, ProfileConfigError, ReturnShape};

/// A statically declared sub-profile relation: a stable name plus an
/// accessor that reads the already-loaded relation off the account shape.
///
/// The accessor must only look at data populated by the original fetch.
/// Accessors that lazily query defeat the whole mechanism; the resolver
/// cannot detect that, so it is a caller obligation.
#[derive(Debug)]
pub struct ProfileRelation<A, V> {
    name: &'static str,
    accessor: fn(&A) -> Option<V>,
}

impl<A, V> ProfileRelation<A, V> {
    pub fn new(name: &'static str, accessor: fn(&A) -> Option<V>) -> Self {
        Self { name, accessor }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<A, V> Clone for ProfileRelation<A, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, V> Copy for ProfileRelation<A, V> {}

/// Maps an eager-loaded account shape to the most specific applicable
/// entity without issuing queries.
///
/// `A` is the account shape the query layer produces (base row plus its
/// optional sub-profile rows); `V` is the tagged variant type the
/// accessors return. Built once at startup from validated configuration
/// and a relation table, then shared freely.
#[derive(Debug)]
pub struct ProfileResolver<A, V> {
    relations: Vec<ProfileRelation<A, V>>,
    spec: Vec<&'static str>,
    shape: ReturnShape,
}

impl<A, V> ProfileResolver<A, V> {
    /// Order the declared relation table by the configured preference.
    ///
    /// A preferred name with no declaration is rejected, as is a table
    /// that declares the same name twice. Declared relations absent from
    /// the preference are dropped: the configuration is authoritative for
    /// both resolution order and the eager-load spec.
    pub fn new(
        config: &ProfileConfig,
        table: Vec<ProfileRelation<A, V>>,
    ) -> Result<Self, ProfileConfigError> {
        let mut declared = HashSet::new();
        for relation in &table {
            if !declared.insert(relation.name) {
                return Err(ProfileConfigError::DuplicateDeclaration(relation.name.to_string()));
            }
        }

        let mut relations = Vec::with_capacity(config.preference().len());
        for name in config.preference() {
            let relation = table
                .iter()
                .find(|r| r.name == name.as_str())
                .ok_or_else(|| ProfileConfigError::UnknownRelation(name.clone()))?;
            relations.push(*relation);
        }

        if relations.len() < table.len() {
            tracing::debug!(
                "{} declared relation(s) not named in the profile preference were dropped",
                table.len() - relations.len()
            );
        }

        let spec = relations.iter().map(|r| r.name).collect();

        Ok(Self { relations, spec, shape: config.shape() })
    }

    /// Relations that must be eager-loaded on any query whose rows will
    /// later be resolved, in preference order. Stable across calls.
    pub fn eager_load_spec(&self) -> &[&'static str] {
        &self.spec
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    /// Resolve an eager-loaded account to its most specific entity.
    ///
    /// Checks each relation in preference order and takes the first
    /// populated one; accounts with no populated relation stand on their
    /// own. Total over well-formed input: no queries, no failure path.
    /// More than one populated relation is a schema-integrity situation;
    /// the first match in preference order wins deterministically.
    pub fn resolve<'a>(&self, account: &'a A) -> Resolution<'a, A, V> {
        let matched = self
            .relations
            .iter()
            .find_map(|relation| (relation.accessor)(account).map(|v| (relation.name, v)));

        Resolution { account, matched, shape: self.shape }
    }
}

/// The outcome of resolving one account: the account reference, the first
/// populated sub-profile (if any), and the configured return shape.
pub struct Resolution<'a, A, V> {
    account: &'a A,
    matched: Option<(&'static str, V)>,
    shape: ReturnShape,
}

/// Caller-facing entity chosen by the return shape.
#[derive(Debug, PartialEq)]
pub enum Entity<'a, A, V> {
    Profile(&'a V),
    Account(&'a A),
}

impl<'a, A, V> Resolution<'a, A, V> {
    /// The entity under the configured shape: the matched sub-profile for
    /// `Specialized`, the account row otherwise and always for `Raw`.
    pub fn entity(&self) -> Entity<'_, A, V> {
        match (&self.shape, &self.matched) {
            (ReturnShape::Specialized, Some((_, profile))) => Entity::Profile(profile),
            _ => Entity::Account(self.account),
        }
    }

    /// The underlying account row, regardless of shape.
    pub fn account(&self) -> &'a A {
        self.account
    }

    /// Name of the relation that matched, if any. Available in both
    /// shapes so `Raw` callers can still dispatch on specialization.
    pub fn relation(&self) -> Option<&'static str> {
        self.matched.as_ref().map(|(name, _)| *name)
    }

    /// The matched sub-profile, if any, regardless of shape.
    pub fn profile(&self) -> Option<&V> {
        self.matched.as_ref().map(|(_, profile)| profile)
    }

    /// Consume the resolution, keeping only the matched sub-profile.
    pub fn into_profile(self) -> Option<V> {
        self.matched.map(|(_, profile)| profile)
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Staff {
        badge: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Shopper {
        points: i64,
    }

    #[derive(Debug)]
    struct LoadedAccount {
        id: u32,
        admin: Option<Staff>,
        customer: Option<Shopper>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Variant {
        Admin(Staff),
        Customer(Shopper),
    }

    fn table() -> Vec<ProfileRelation<LoadedAccount, Variant>> {
        vec![
            ProfileRelation::new("admin", |a| a.admin.clone().map(Variant::Admin)),
            ProfileRelation::new("customer", |a| a.customer.clone().map(Variant::Customer)),
        ]
    }

    fn resolver(preference: &[&str], shape: ReturnShape) -> ProfileResolver<LoadedAccount, Variant> {
        let config = ProfileConfig::new(
            preference.iter().map(|s| s.to_string()).collect(),
            shape,
        )
        .unwrap();
        ProfileResolver::new(&config, table()).unwrap()
    }

    #[test]
    fn test_no_populated_relation_returns_account() {
        let resolver = resolver(&["admin", "customer"], ReturnShape::Specialized);
        let account = LoadedAccount { id: 1, admin: None, customer: None };

        let resolution = resolver.resolve(&account);
        assert_eq!(resolution.relation(), None);
        match resolution.entity() {
            Entity::Account(a) => assert_eq!(a.id, 1),
            Entity::Profile(_) => panic!("expected the account itself"),
        }
    }

    #[test]
    fn test_single_populated_relation_wins() {
        let resolver = resolver(&["admin", "customer"], ReturnShape::Specialized);
        let account = LoadedAccount {
            id: 2,
            admin: None,
            customer: Some(Shopper { points: 40 }),
        };

        let resolution = resolver.resolve(&account);
        assert_eq!(resolution.relation(), Some("customer"));
        assert_eq!(
            resolution.profile(),
            Some(&Variant::Customer(Shopper { points: 40 }))
        );
    }

    #[test]
    fn test_admin_preferred_over_unpopulated_customer() {
        let resolver = resolver(&["admin", "customer"], ReturnShape::Specialized);
        let account = LoadedAccount {
            id: 3,
            admin: Some(Staff { badge: 7 }),
            customer: None,
        };

        let resolution = resolver.resolve(&account);
        assert_eq!(resolution.relation(), Some("admin"));
    }

    #[test]
    fn test_tie_break_follows_preference_order() {
        // Both relations populated: the first in declared order wins,
        // regardless of declaration order in the table.
        let account = LoadedAccount {
            id: 4,
            admin: Some(Staff { badge: 9 }),
            customer: Some(Shopper { points: 100 }),
        };

        let admin_first = resolver(&["admin", "customer"], ReturnShape::Specialized);
        assert_eq!(admin_first.resolve(&account).relation(), Some("admin"));

        let customer_first = resolver(&["customer", "admin"], ReturnShape::Specialized);
        assert_eq!(customer_first.resolve(&account).relation(), Some("customer"));
    }

    #[test]
    fn test_eager_load_spec_is_order_stable() {
        let resolver = resolver(&["customer", "admin"], ReturnShape::Specialized);
        assert_eq!(resolver.eager_load_spec(), ["customer", "admin"]);
        // Repeated calls return the identical sequence
        assert_eq!(resolver.eager_load_spec(), resolver.eager_load_spec());
    }

    #[test]
    fn test_raw_shape_returns_account_but_exposes_profile() {
        let resolver = resolver(&["admin", "customer"], ReturnShape::Raw);
        let account = LoadedAccount {
            id: 5,
            admin: None,
            customer: Some(Shopper { points: 12 }),
        };

        let resolution = resolver.resolve(&account);
        match resolution.entity() {
            Entity::Account(a) => assert_eq!(a.id, 5),
            Entity::Profile(_) => panic!("raw shape must hand back the account row"),
        }
        // The customer attributes are still reachable
        assert_eq!(resolution.relation(), Some("customer"));
        assert_eq!(
            resolution.into_profile(),
            Some(Variant::Customer(Shopper { points: 12 }))
        );
    }

    #[test]
    fn test_unknown_preferred_relation_rejected() {
        let config = ProfileConfig::new(
            vec!["admin".to_string(), "vendor".to_string()],
            ReturnShape::Specialized,
        )
        .unwrap();

        let err = ProfileResolver::new(&config, table()).unwrap_err();
        assert_eq!(err, ProfileConfigError::UnknownRelation("vendor".to_string()));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let config = ProfileConfig::new(
            vec!["admin".to_string()],
            ReturnShape::Specialized,
        )
        .unwrap();

        let mut dup = table();
        dup.push(ProfileRelation::new("admin", |_| None));

        let err = ProfileResolver::new(&config, dup).unwrap_err();
        assert_eq!(err, ProfileConfigError::DuplicateDeclaration("admin".to_string()));
    }

    #[test]
    fn test_unpreferred_declared_relation_is_dropped() {
        // Only "customer" is preferred; "admin" never resolves and is
        // excluded from the eager-load spec.
        let resolver = resolver(&["customer"], ReturnShape::Specialized);
        assert_eq!(resolver.eager_load_spec(), ["customer"]);

        let account = LoadedAccount {
            id: 6,
            admin: Some(Staff { badge: 1 }),
            customer: None,
        };
        assert_eq!(resolver.resolve(&account).relation(), None);
    }
}
