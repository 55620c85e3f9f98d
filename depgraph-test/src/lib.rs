// Integration test utilities and fixtures for depgraph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use depgraph_core::store::{CodeObjectStore, SqliteStore};
use depgraph_core::types::{CallReference, CodeObject, ObjectKind, Parameter};

/// The four-procedure example: `a → b → c → a` plus `d → b`, all in
/// package `app`.
pub fn scenario_objects() -> Vec<CodeObject> {
    let procedure = |name: &str, callee: &str| {
        CodeObject::new("app", name, ObjectKind::Procedure)
            .with_calls(vec![CallReference::new(callee).at_line(2)])
            .with_source(format!("PROCEDURE {name} IS\nBEGIN\n  {callee};\nEND;"))
    };
    vec![
        procedure("a", "b"),
        procedure("b", "c"),
        procedure("c", "a"),
        procedure("d", "b"),
    ]
}

/// A small order-processing schema exercising every resolution rule.
///
/// Ten objects, thirteen call sites: one call to `dbms_output.put_line`
/// stays unresolved, one zero-argument call to the overloaded
/// `pkg_log.log_event` is ambiguous, and `pkg_stock.release` is recursive.
pub fn order_system() -> Vec<CodeObject> {
    let num = |name: &str| Parameter::new(name, "NUMBER");

    let log_short = CodeObject::new("pkg_log", "log_event", ObjectKind::Procedure)
        .with_id("pkg_log.log_event-a1")
        .overloaded()
        .with_parameters(vec![Parameter::new("p_msg", "VARCHAR2")])
        .with_source("PROCEDURE log_event(p_msg VARCHAR2) IS\nBEGIN\n  NULL;\nEND;");

    let log_levelled = CodeObject::new("pkg_log", "log_event", ObjectKind::Procedure)
        .with_id("pkg_log.log_event-b2")
        .overloaded()
        .with_parameters(vec![
            Parameter::new("p_msg", "VARCHAR2"),
            Parameter::new("p_level", "PLS_INTEGER"),
        ])
        .with_source("PROCEDURE log_event(p_msg VARCHAR2, p_level PLS_INTEGER) IS\nBEGIN\n  NULL;\nEND;");

    let mut place_order = CodeObject::new("pkg_orders", "place_order", ObjectKind::Procedure)
        .with_parameters(vec![num("p_order_id"), num("p_qty").with_default("1")])
        .with_calls(vec![
            CallReference::new("validate_order").at_line(3).with_positional(["p_order_id"]),
            CallReference::new("pkg_stock.reserve")
                .at_line(4)
                .with_positional(["p_order_id", "p_qty"]),
            CallReference::new("pkg_log.log_event").at_line(5).with_positional(["<lit_1>"]),
            CallReference::new("audit_trail").at_line(6).with_positional(["p_order_id"]),
            CallReference::new("dbms_output.put_line").at_line(7).with_positional(["<lit_2>"]),
        ])
        .with_source(
            "PROCEDURE place_order(p_order_id NUMBER, p_qty NUMBER DEFAULT 1) IS\nBEGIN\n  \
             validate_order(p_order_id);\n  pkg_stock.reserve(p_order_id, p_qty);\n  \
             pkg_log.log_event(<lit_1>);\n  audit_trail(p_order_id);\n  \
             dbms_output.put_line(<lit_2>);\nEND;",
        );
    place_order.literal_map = Some(BTreeMap::from([
        ("<lit_1>".into(), "'placed'".into()),
        ("<lit_2>".into(), "'done'".into()),
    ]));

    let validate_order = CodeObject::new("pkg_orders", "validate_order", ObjectKind::Function)
        .with_parameters(vec![num("p_order_id")])
        .with_calls(vec![
            CallReference::new("pkg_log.log_event")
                .at_line(3)
                .with_positional(["'validating'", "2"]),
        ])
        .with_source("FUNCTION validate_order(p_order_id NUMBER) RETURN BOOLEAN IS\nBEGIN\n  pkg_log.log_event('validating', 2);\n  RETURN TRUE;\nEND;");

    let cancel_order = CodeObject::new("pkg_orders", "cancel_order", ObjectKind::Procedure)
        .with_parameters(vec![num("p_order_id")])
        .with_calls(vec![
            CallReference::new("pkg_stock.release").at_line(3).with_positional(["p_order_id"]),
            CallReference::new("billing.pkg_invoice.void_invoice")
                .at_line(4)
                .with_positional(["p_order_id"]),
            CallReference::new("pkg_log.log_event")
                .at_line(5)
                .with_named("p_msg", "'cancelled'"),
        ])
        .with_source("PROCEDURE cancel_order(p_order_id NUMBER) IS\nBEGIN\n  pkg_stock.release(p_order_id);\n  billing.pkg_invoice.void_invoice(p_order_id);\n  pkg_log.log_event(p_msg => 'cancelled');\nEND;");

    let reserve = CodeObject::new("pkg_stock", "reserve", ObjectKind::Procedure)
        .with_parameters(vec![num("p_order_id"), num("p_qty")])
        .with_calls(vec![CallReference::new("pkg_log.log_event").at_line(3)])
        .with_source("PROCEDURE reserve(p_order_id NUMBER, p_qty NUMBER) IS\nBEGIN\n  pkg_log.log_event;\nEND;");

    let release = CodeObject::new("pkg_stock", "release", ObjectKind::Procedure)
        .with_parameters(vec![num("p_order_id")])
        .with_calls(vec![
            CallReference::new("release").at_line(4).with_positional(["p_order_id"]),
        ])
        .with_source("PROCEDURE release(p_order_id NUMBER) IS\nBEGIN\n  IF p_order_id > 0 THEN\n    release(p_order_id - 1);\n  END IF;\nEND;");

    let void_invoice = CodeObject::new("pkg_invoice", "void_invoice", ObjectKind::Procedure)
        .with_parameters(vec![num("p_order_id")])
        .with_calls(vec![
            CallReference::new("audit_trail").at_line(3).with_positional(["p_order_id"]),
        ])
        .with_source("PROCEDURE void_invoice(p_order_id NUMBER) IS\nBEGIN\n  audit_trail(p_order_id);\nEND;");

    let audit_trail = CodeObject::new("", "audit_trail", ObjectKind::Procedure)
        .with_parameters(vec![num("p_ref")])
        .with_source("PROCEDURE audit_trail(p_ref NUMBER) IS\nBEGIN\n  INSERT INTO audit_log VALUES (p_ref, SYSDATE);\nEND;");

    let trigger = CodeObject::new("", "trg_orders_audit", ObjectKind::Trigger)
        .with_calls(vec![
            CallReference::new("pkg_orders.cancel_order")
                .at_line(3)
                .with_positional([":old.id"]),
        ])
        .with_source("TRIGGER trg_orders_audit AFTER DELETE ON orders FOR EACH ROW\nBEGIN\n  pkg_orders.cancel_order(:old.id);\nEND;");

    vec![
        place_order,
        validate_order,
        cancel_order,
        reserve,
        release,
        log_short,
        log_levelled,
        void_invoice,
        audit_trail,
        trigger,
    ]
}

/// A file-backed `SqliteStore` in a temporary directory.
#[derive(Debug)]
pub struct TestStore {
    pub dir: tempfile::TempDir,
    pub store: SqliteStore,
}

impl TestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = SqliteStore::open(&dir.path().join("objects.db")).expect("open store");
        Self { dir, store }
    }

    /// Create a store holding `objects`.
    pub async fn with_objects(objects: &[CodeObject]) -> Self {
        let fixture = Self::new();
        fixture
            .store
            .upsert_objects_batch(objects)
            .await
            .expect("seed store");
        fixture
    }

    /// Directory for graph files written by a test.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("objects.db")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
