use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Anything permission checks can be run against. Implemented by the
/// integrating application's user/session type.
pub trait Principal {
    /// Global grant for a named permission.
    fn has_perm(&self, perm: &str) -> bool;

    /// Object-level grant. Backends without per-object permissions keep
    /// the default.
    fn has_object_perm(&self, _perm: &str, _object: Uuid) -> bool {
        false
    }

    fn has_perms(&self, perms: &[String]) -> bool {
        perms.iter().all(|p| self.has_perm(p))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("permission denied: {0}")]
    Denied(String),

    /// An action was checked that no permission list is mapped for. This
    /// is a configuration error, not a denial.
    #[error("no permissions mapped for action '{0}'")]
    MissingActionPermissions(String),

    /// A global and an object-level grant held simultaneously. Usually
    /// means the permission backend ignores its object argument, which
    /// can mask a real per-object rule.
    #[error("global and object-level grants both hold for '{0}'")]
    AmbiguousGrant(String),
}

/// The model a permission string is formatted against.
#[derive(Debug, Clone, Copy)]
pub struct ModelTarget<'a> {
    pub app_label: &'a str,
    pub model_name: &'a str,
}

fn format_perm(template: &str, target: ModelTarget<'_>) -> String {
    template
        .replace("{app}", target.app_label)
        .replace("{model}", target.model_name)
}

/// Maps handler actions to required permission strings.
///
/// The default table covers the CRUD actions with `{app}.<verb>_{model}`
/// templates; `with_action` overrides a single action (an empty list makes
/// the action open). *All* listed permissions must hold to allow an
/// action. `list`-style actions never run an object-level check, since
/// there is no object to check against.
#[derive(Debug, Clone)]
pub struct ActionPermissions {
    perms_map: HashMap<String, Vec<String>>,
    list_actions: HashSet<String>,
}

impl Default for ActionPermissions {
    fn default() -> Self {
        let mut perms_map = HashMap::new();
        perms_map.insert("list".to_string(), vec!["{app}.view_{model}".to_string()]);
        perms_map.insert("retrieve".to_string(), vec!["{app}.view_{model}".to_string()]);
        perms_map.insert("create".to_string(), vec!["{app}.add_{model}".to_string()]);
        perms_map.insert("update".to_string(), vec!["{app}.change_{model}".to_string()]);
        perms_map.insert("partial_update".to_string(), vec!["{app}.change_{model}".to_string()]);
        perms_map.insert("destroy".to_string(), vec!["{app}.delete_{model}".to_string()]);

        let list_actions = ["list", "create"].iter().map(|s| s.to_string()).collect();

        Self { perms_map, list_actions }
    }
}

impl ActionPermissions {
    /// An empty table with no defaults, for handlers that map every
    /// action themselves.
    pub fn empty() -> Self {
        Self { perms_map: HashMap::new(), list_actions: HashSet::new() }
    }

    /// Override (or add) the permission list for one action.
    pub fn with_action(mut self, action: impl Into<String>, perms: Vec<String>) -> Self {
        self.perms_map.insert(action.into(), perms);
        self
    }

    /// Mark an additional action as list-style (no object check).
    pub fn with_list_action(mut self, action: impl Into<String>) -> Self {
        self.list_actions.insert(action.into());
        self
    }

    /// Permission strings required for an action, formatted against the
    /// target model.
    pub fn permissions_for_action(
        &self,
        action: &str,
        target: ModelTarget<'_>,
    ) -> Result<Vec<String>, PermissionError> {
        let templates = self
            .perms_map
            .get(action)
            .ok_or_else(|| PermissionError::MissingActionPermissions(action.to_string()))?;

        Ok(templates.iter().map(|t| format_perm(t, target)).collect())
    }

    /// Check an action: global permissions first, then the object-level
    /// fallback for detail actions when an object is at hand.
    pub fn check(
        &self,
        principal: &impl Principal,
        action: &str,
        target: ModelTarget<'_>,
        object: Option<Uuid>,
    ) -> Result<(), PermissionError> {
        let perms = self.permissions_for_action(action, target)?;

        // Check permissions for the action irrespective of object
        if principal.has_perms(&perms) {
            return Ok(());
        }

        // Action relates to an object, check object-level permission
        if !self.list_actions.contains(action) {
            if let Some(object) = object {
                if perms.iter().all(|p| principal.has_object_perm(p, object)) {
                    return Ok(());
                }
            }
        }

        Err(PermissionError::Denied(action.to_string()))
    }
}

/// A single permission for all request methods, checked globally or
/// against one object.
///
/// Differs from the action table in that it does not need an action or a
/// target model.
#[derive(Debug, Clone)]
pub struct SimpleObjectPermissions {
    permission: String,
}

impl SimpleObjectPermissions {
    pub fn new(permission: impl Into<String>) -> Self {
        Self { permission: permission.into() }
    }

    pub fn check(&self, principal: &impl Principal) -> Result<(), PermissionError> {
        if principal.has_perm(&self.permission) {
            Ok(())
        } else {
            Err(PermissionError::Denied(self.permission.clone()))
        }
    }

    /// Object-level check. Object and global grants holding at once is
    /// reported as `AmbiguousGrant`: a backend that checks the same
    /// predicate regardless of whether an object is supplied can hide a
    /// real per-object rule behind the global one.
    pub fn check_object(
        &self,
        principal: &impl Principal,
        object: Uuid,
    ) -> Result<(), PermissionError> {
        let global = principal.has_perm(&self.permission);
        let object_level = principal.has_object_perm(&self.permission, object);

        if global && object_level {
            return Err(PermissionError::AmbiguousGrant(self.permission.clone()));
        }
        if global || object_level {
            Ok(())
        } else {
            Err(PermissionError::Denied(self.permission.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestPrincipal {
        perms: HashSet<String>,
        object_perms: HashSet<(String, Uuid)>,
    }

    impl TestPrincipal {
        fn grant(mut self, perm: &str) -> Self {
            self.perms.insert(perm.to_string());
            self
        }

        fn grant_object(mut self, perm: &str, object: Uuid) -> Self {
            self.object_perms.insert((perm.to_string(), object));
            self
        }
    }

    impl Principal for TestPrincipal {
        fn has_perm(&self, perm: &str) -> bool {
            self.perms.contains(perm)
        }

        fn has_object_perm(&self, perm: &str, object: Uuid) -> bool {
            self.object_perms.contains(&(perm.to_string(), object))
        }
    }

    const TARGET: ModelTarget<'static> = ModelTarget { app_label: "shop", model_name: "order" };

    #[test]
    fn test_default_crud_mapping() {
        let table = ActionPermissions::default();

        assert_eq!(
            table.permissions_for_action("retrieve", TARGET).unwrap(),
            vec!["shop.view_order".to_string()]
        );
        assert_eq!(
            table.permissions_for_action("destroy", TARGET).unwrap(),
            vec!["shop.delete_order".to_string()]
        );
    }

    #[test]
    fn test_unmapped_action_is_config_error() {
        let table = ActionPermissions::default();
        let err = table.permissions_for_action("approve", TARGET).unwrap_err();
        assert_eq!(err, PermissionError::MissingActionPermissions("approve".to_string()));
    }

    #[test]
    fn test_global_grant_allows() {
        let table = ActionPermissions::default();
        let principal = TestPrincipal::default().grant("shop.view_order");

        assert!(table.check(&principal, "list", TARGET, None).is_ok());
        assert!(table.check(&principal, "retrieve", TARGET, None).is_ok());
    }

    #[test]
    fn test_missing_grant_denies() {
        let table = ActionPermissions::default();
        let principal = TestPrincipal::default();

        assert_eq!(
            table.check(&principal, "create", TARGET, None).unwrap_err(),
            PermissionError::Denied("create".to_string())
        );
    }

    #[test]
    fn test_empty_override_opens_action() {
        let table = ActionPermissions::default().with_action("create", vec![]);
        let principal = TestPrincipal::default();

        assert!(table.check(&principal, "create", TARGET, None).is_ok());
        // Other actions keep their defaults
        assert!(table.check(&principal, "destroy", TARGET, None).is_err());
    }

    #[test]
    fn test_object_level_fallback_for_detail_action() {
        let object = Uuid::new_v4();
        let table = ActionPermissions::default();
        let principal = TestPrincipal::default().grant_object("shop.change_order", object);

        assert!(table.check(&principal, "update", TARGET, Some(object)).is_ok());
        // A different object is still denied
        assert!(table.check(&principal, "update", TARGET, Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_list_action_skips_object_check() {
        let object = Uuid::new_v4();
        let table = ActionPermissions::default();
        let principal = TestPrincipal::default().grant_object("shop.view_order", object);

        assert_eq!(
            table.check(&principal, "list", TARGET, Some(object)).unwrap_err(),
            PermissionError::Denied("list".to_string())
        );
    }

    #[test]
    fn test_simple_object_permissions() {
        let object = Uuid::new_v4();
        let policy = SimpleObjectPermissions::new("shop.ship_order");

        let by_object = TestPrincipal::default().grant_object("shop.ship_order", object);
        assert!(policy.check_object(&by_object, object).is_ok());
        assert!(policy.check(&by_object).is_err());

        let globally = TestPrincipal::default().grant("shop.ship_order");
        assert!(policy.check(&globally).is_ok());
        assert!(policy.check_object(&globally, object).is_ok());
    }

    #[test]
    fn test_simultaneous_grants_are_ambiguous() {
        let object = Uuid::new_v4();
        let policy = SimpleObjectPermissions::new("shop.ship_order");
        let principal = TestPrincipal::default()
            .grant("shop.ship_order")
            .grant_object("shop.ship_order", object);

        assert_eq!(
            policy.check_object(&principal, object).unwrap_err(),
            PermissionError::AmbiguousGrant("shop.ship_order".to_string())
        );
    }
}
