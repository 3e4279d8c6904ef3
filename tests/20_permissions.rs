use std::collections::HashSet;
use uuid::Uuid;

use gantry::permissions::{
    ActionPermissions, ModelTarget, PermissionError, Principal, SimpleObjectPermissions,
};

// Action-permission checks as an integrating application would wire them:
// a session type implementing Principal, checked per handler action.

#[derive(Default)]
struct Session {
    perms: HashSet<String>,
    object_perms: HashSet<(String, Uuid)>,
}

impl Session {
    fn grant(mut self, perm: &str) -> Self {
        self.perms.insert(perm.to_string());
        self
    }

    fn grant_object(mut self, perm: &str, object: Uuid) -> Self {
        self.object_perms.insert((perm.to_string(), object));
        self
    }
}

impl Principal for Session {
    fn has_perm(&self, perm: &str) -> bool {
        self.perms.contains(perm)
    }

    fn has_object_perm(&self, perm: &str, object: Uuid) -> bool {
        self.object_perms.contains(&(perm.to_string(), object))
    }
}

const ORDERS: ModelTarget<'static> = ModelTarget { app_label: "shop", model_name: "order" };

#[test]
fn editor_can_run_the_crud_cycle() {
    let table = ActionPermissions::default();
    let editor = Session::default()
        .grant("shop.view_order")
        .grant("shop.add_order")
        .grant("shop.change_order");

    for action in ["list", "retrieve", "create", "update", "partial_update"] {
        assert!(table.check(&editor, action, ORDERS, None).is_ok(), "action {}", action);
    }
    assert!(table.check(&editor, "destroy", ORDERS, None).is_err());
}

#[test]
fn open_action_override_skips_checks() {
    let table = ActionPermissions::default().with_action("create", vec![]);
    let anonymous = Session::default();

    assert!(table.check(&anonymous, "create", ORDERS, None).is_ok());
    assert!(table.check(&anonymous, "list", ORDERS, None).is_err());
}

#[test]
fn owner_reaches_own_object_only() {
    let own = Uuid::new_v4();
    let other = Uuid::new_v4();
    let table = ActionPermissions::default();
    let owner = Session::default().grant_object("shop.change_order", own);

    assert!(table.check(&owner, "update", ORDERS, Some(own)).is_ok());
    assert!(table.check(&owner, "update", ORDERS, Some(other)).is_err());
    // Without an object at hand the detail action is denied outright
    assert!(table.check(&owner, "update", ORDERS, None).is_err());
}

#[test]
fn custom_action_needs_explicit_mapping() {
    let table = ActionPermissions::default();
    let sudo = Session::default().grant("shop.ship_order");

    assert_eq!(
        table.check(&sudo, "ship", ORDERS, None).unwrap_err(),
        PermissionError::MissingActionPermissions("ship".to_string())
    );

    let table = table.with_action("ship", vec!["{app}.ship_{model}".to_string()]);
    assert!(table.check(&sudo, "ship", ORDERS, None).is_ok());
}

#[test]
fn simple_object_policy_flags_ambiguous_backends() {
    let object = Uuid::new_v4();
    let policy = SimpleObjectPermissions::new("shop.audit_order");

    let both = Session::default()
        .grant("shop.audit_order")
        .grant_object("shop.audit_order", object);

    assert_eq!(
        policy.check_object(&both, object).unwrap_err(),
        PermissionError::AmbiguousGrant("shop.audit_order".to_string())
    );
}
