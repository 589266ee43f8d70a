//! Named slots that carry values from one response to the next.
//!
//! A [`Binding`] placed in an expectation tree captures the actual value the
//! first time it is matched (while its slot is empty) and asserts equality
//! against the captured value on every later match. Typical use: capture an
//! `id` from a create response, then assert it in the follow-up `GET`.
//!
//! A slot's type is fixed when it is first requested. Asking for the same name
//! with another type never panics; the returned binding fails every match with
//! a conflict instead, so it stays usable inside declarative test tables.
//!
//! The registry handle is cheap to clone and every slot is behind its own
//! lock, but bindings are meant to be driven by one test case at a time.
//! Parallel runners should give each worker its own [`Values`].

use crate::coerce::{self, check_scalar, Allowed};
use crate::failure::Mismatch;
use crate::predicate::Predicate;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Element type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
}

impl SlotKind {
    pub fn name(&self) -> &'static str {
        match self {
            SlotKind::Bool => "bool",
            SlotKind::Int => "int",
            SlotKind::Float => "float",
            SlotKind::String => "string",
            SlotKind::Array => "array",
            SlotKind::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    String(Option<String>),
    Array(Option<Vec<Value>>),
    Object(Option<Map<String, Value>>),
}

impl Slot {
    fn empty(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Bool => Slot::Bool(None),
            SlotKind::Int => Slot::Int(None),
            SlotKind::Float => Slot::Float(None),
            SlotKind::String => Slot::String(None),
            SlotKind::Array => Slot::Array(None),
            SlotKind::Object => Slot::Object(None),
        }
    }

    fn kind(&self) -> SlotKind {
        match self {
            Slot::Bool(_) => SlotKind::Bool,
            Slot::Int(_) => SlotKind::Int,
            Slot::Float(_) => SlotKind::Float,
            Slot::String(_) => SlotKind::String,
            Slot::Array(_) => SlotKind::Array,
            Slot::Object(_) => SlotKind::Object,
        }
    }

    fn is_set(&self) -> bool {
        match self {
            Slot::Bool(v) => v.is_some(),
            Slot::Int(v) => v.is_some(),
            Slot::Float(v) => v.is_some(),
            Slot::String(v) => v.is_some(),
            Slot::Array(v) => v.is_some(),
            Slot::Object(v) => v.is_some(),
        }
    }

    /// Store `actual` into an empty slot.
    fn capture(&mut self, actual: Option<&Value>) -> Result<(), Mismatch> {
        let kind = self.kind();
        let Some(value) = coerce::present(actual) else {
            return Err(Mismatch::Missing {
                expected: kind.name().to_string(),
            });
        };
        let type_mismatch = || Mismatch::TypeMismatch {
            expected: kind.name(),
            actual: coerce::type_name(Some(value)),
        };

        *self = match kind {
            SlotKind::Bool => Slot::Bool(Some(value.as_bool().ok_or_else(type_mismatch)?)),
            SlotKind::Int => Slot::Int(Some(coerce::as_i64(value).ok_or_else(type_mismatch)?)),
            SlotKind::Float => Slot::Float(Some(coerce::as_f64(value).ok_or_else(type_mismatch)?)),
            SlotKind::String => Slot::String(Some(
                value.as_str().ok_or_else(type_mismatch)?.to_string(),
            )),
            SlotKind::Array => Slot::Array(Some(
                value.as_array().ok_or_else(type_mismatch)?.clone(),
            )),
            SlotKind::Object => Slot::Object(Some(
                value.as_object().ok_or_else(type_mismatch)?.clone(),
            )),
        };
        Ok(())
    }

    /// Compare `actual` against the stored value.
    fn assert(&self, actual: Option<&Value>) -> Result<(), Mismatch> {
        match self {
            Slot::Bool(Some(b)) => check_scalar(Allowed::Bool(std::slice::from_ref(b)), actual),
            Slot::Int(Some(i)) => check_scalar(Allowed::Int(std::slice::from_ref(i)), actual),
            Slot::Float(Some(f)) => check_scalar(Allowed::Float(std::slice::from_ref(f)), actual),
            Slot::String(Some(s)) => check_scalar(Allowed::String(std::slice::from_ref(s)), actual),
            Slot::Array(Some(items)) => assert_json(Value::Array(items.clone()), "array", actual),
            Slot::Object(Some(fields)) => {
                assert_json(Value::Object(fields.clone()), "object", actual)
            }
            _ => Ok(()),
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Slot::Bool(v) => v.map(Value::Bool),
            Slot::Int(v) => v.map(Value::from),
            Slot::Float(v) => v.map(coerce::float_value),
            Slot::String(v) => v.clone().map(Value::String),
            Slot::Array(v) => v.clone().map(Value::Array),
            Slot::Object(v) => v.clone().map(Value::Object),
        }
    }
}

fn assert_json(stored: Value, kind: &'static str, actual: Option<&Value>) -> Result<(), Mismatch> {
    let Some(value) = coerce::present(actual) else {
        return Err(Mismatch::Missing {
            expected: kind.to_string(),
        });
    };
    if coerce::type_name(Some(value)) != kind {
        return Err(Mismatch::TypeMismatch {
            expected: kind,
            actual: coerce::type_name(Some(value)),
        });
    }
    if *value == stored {
        Ok(())
    } else {
        Err(Mismatch::ValueMismatch {
            allowed: vec![stored],
            actual: value.clone(),
        })
    }
}

type SlotRef = Arc<Mutex<Slot>>;

/// Registry of named slots, shared by every test case that references it.
///
/// There is no reset between test cases: create a new registry when a test
/// needs isolation.
#[derive(Debug, Clone, Default)]
pub struct Values {
    slots: Arc<Mutex<BTreeMap<String, SlotRef>>>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or lazily create the slot for `name`.
    fn slot(&self, name: &str, kind: SlotKind) -> Result<SlotRef, Mismatch> {
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::empty(kind))))
            .clone();
        let bound = slot.lock().kind();
        if bound == kind {
            Ok(slot)
        } else {
            Err(Mismatch::BindingConflict {
                name: name.to_string(),
                bound: bound.name(),
                requested: kind.name(),
            })
        }
    }

    fn bind(&self, name: &str, kind: SlotKind) -> Binding {
        Binding {
            name: Arc::from(name),
            kind,
            slot: self.slot(name, kind),
        }
    }

    pub fn bind_bool(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::Bool)
    }

    pub fn bind_int(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::Int)
    }

    pub fn bind_float(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::Float)
    }

    pub fn bind_string(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::String)
    }

    pub fn bind_array(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::Array)
    }

    pub fn bind_object(&self, name: &str) -> Binding {
        self.bind(name, SlotKind::Object)
    }

    fn read(&self, name: &str) -> Option<Slot> {
        let slot = self.slots.lock().get(name).cloned()?;
        let snapshot = slot.lock().clone();
        Some(snapshot)
    }

    /// Current value, or `false` when unset or bound to another type.
    pub fn get_bool(&self, name: &str) -> bool {
        match self.read(name) {
            Some(Slot::Bool(Some(b))) => b,
            _ => false,
        }
    }

    /// Current value, or `0` when unset or not numeric.
    ///
    /// An integral float slot is accepted with a warning, since many JSON
    /// decoders produce floats for every number.
    pub fn get_int(&self, name: &str) -> i64 {
        match self.read(name) {
            Some(Slot::Int(Some(i))) => i,
            Some(Slot::Float(Some(f))) => match coerce::float_to_int(f) {
                Some(i) => {
                    warn!(binding = name, value = f, "reading float binding as int");
                    i
                }
                None => 0,
            },
            _ => 0,
        }
    }

    /// Current value, or `0.0` when unset or not numeric.
    pub fn get_float(&self, name: &str) -> f64 {
        match self.read(name) {
            Some(Slot::Float(Some(f))) => f,
            Some(Slot::Int(Some(i))) => coerce::int_to_float(i).unwrap_or_default(),
            _ => 0.0,
        }
    }

    /// Current value, or an empty string when unset or bound to another type.
    pub fn get_string(&self, name: &str) -> String {
        match self.read(name) {
            Some(Slot::String(Some(s))) => s,
            _ => String::new(),
        }
    }

    pub fn get_array(&self, name: &str) -> Vec<Value> {
        match self.read(name) {
            Some(Slot::Array(Some(items))) => items,
            _ => Vec::new(),
        }
    }

    pub fn get_object(&self, name: &str) -> Map<String, Value> {
        match self.read(name) {
            Some(Slot::Object(Some(fields))) => fields,
            _ => Map::new(),
        }
    }

    /// Current value of any slot as JSON, if set.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.read(name).and_then(|slot| slot.to_value())
    }

    fn set(&self, name: &str, value: Slot) -> Result<(), Mismatch> {
        let slot = self.slot(name, value.kind())?;
        *slot.lock() = value;
        Ok(())
    }

    /// Seed a slot, creating it if needed.
    pub fn set_bool(&self, name: &str, value: bool) -> Result<(), Mismatch> {
        self.set(name, Slot::Bool(Some(value)))
    }

    pub fn set_int(&self, name: &str, value: i64) -> Result<(), Mismatch> {
        self.set(name, Slot::Int(Some(value)))
    }

    pub fn set_float(&self, name: &str, value: f64) -> Result<(), Mismatch> {
        self.set(name, Slot::Float(Some(value)))
    }

    pub fn set_string(&self, name: &str, value: impl Into<String>) -> Result<(), Mismatch> {
        self.set(name, Slot::String(Some(value.into())))
    }

    pub fn set_array(&self, name: &str, value: Vec<Value>) -> Result<(), Mismatch> {
        self.set(name, Slot::Array(Some(value)))
    }

    pub fn set_object(&self, name: &str, value: Map<String, Value>) -> Result<(), Mismatch> {
        self.set(name, Slot::Object(Some(value)))
    }

    /// Empty a slot so the next match captures again. Its type stays fixed.
    pub fn reset(&self, name: &str) {
        if let Some(slot) = self.slots.lock().get(name) {
            let mut slot = slot.lock();
            *slot = Slot::empty(slot.kind());
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.read(name).is_some_and(|slot| slot.is_set())
    }

    /// Names of every slot created so far, sorted.
    pub fn names(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }
}

/// A reference to one slot of a [`Values`] registry.
#[derive(Debug, Clone)]
pub struct Binding {
    name: Arc<str>,
    kind: SlotKind,
    slot: Result<SlotRef, Mismatch>,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Capture into an empty slot, or assert against the stored value.
    pub fn check(&self, actual: Option<&Value>) -> Result<(), Mismatch> {
        let slot = self.slot.as_ref().map_err(Clone::clone)?;
        let mut slot = slot.lock();
        if slot.is_set() {
            slot.assert(actual)
        } else {
            slot.capture(actual)?;
            debug!(binding = %self.name, value = ?slot.to_value(), "captured binding");
            Ok(())
        }
    }

    /// Whether two bindings point at the same slot.
    pub fn same_slot(&self, other: &Binding) -> bool {
        match (&self.slot, &other.slot) {
            (Ok(a), Ok(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Binding> for Predicate {
    fn from(binding: Binding) -> Self {
        let label = format!("bound {} {:?}", binding.kind.name(), binding.name);
        Predicate::new(label, move |actual| binding.check(actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_registry_and_bindings_cross_threads() {
        assert_send_sync::<Values>();
        assert_send_sync::<Binding>();

        let values = Values::new();
        let id = values.bind_int("id");
        std::thread::spawn(move || id.check(Some(&json!(9))))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(values.get_int("id"), 9);
    }

    #[test]
    fn test_capture_then_assert() {
        let values = Values::new();
        let id = values.bind_int("x");

        assert!(!values.is_set("x"));
        assert!(id.check(Some(&json!(42))).is_ok());
        assert_eq!(values.get_int("x"), 42);

        assert!(id.check(Some(&json!(42))).is_ok());
        let err = id.check(Some(&json!(43))).unwrap_err();
        assert_eq!(err.to_string(), "expected 42, got 43");
    }

    #[test]
    fn test_rebinding_shares_the_slot() {
        let values = Values::new();
        let first = values.bind_string("token");
        let second = values.bind_string("token");
        assert!(first.same_slot(&second));

        first.check(Some(&json!("abc"))).unwrap();
        assert!(second.check(Some(&json!("abc"))).is_ok());
        assert!(second.check(Some(&json!("xyz"))).is_err());
    }

    #[test]
    fn test_type_conflict_never_panics() {
        let values = Values::new();
        values.bind_int("id");
        let conflicting = values.bind_string("id");

        let err = conflicting.check(Some(&json!("abc"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"binding "id" holds int, cannot be used as string"#
        );
        assert!(values.set_string("id", "abc").is_err());
    }

    #[test]
    fn test_capture_requires_a_value_of_the_slot_type() {
        let values = Values::new();
        let id = values.bind_int("id");

        assert_eq!(
            id.check(None).unwrap_err().to_string(),
            "expected int, got nothing"
        );
        assert_eq!(
            id.check(Some(&json!("7"))).unwrap_err().to_string(),
            "expected int, got string"
        );
        assert!(!values.is_set("id"));

        // integral floats are captured as ints
        id.check(Some(&json!(7.0))).unwrap();
        assert_eq!(values.get_int("id"), 7);
    }

    #[test]
    fn test_array_and_object_slots() {
        let values = Values::new();
        let items = values.bind_array("items");
        let owner = values.bind_object("owner");

        items.check(Some(&json!([1, 2]))).unwrap();
        owner.check(Some(&json!({"name": "ada"}))).unwrap();

        assert!(items.check(Some(&json!([1, 2]))).is_ok());
        assert!(items.check(Some(&json!([2, 1]))).is_err());
        assert_eq!(
            owner.check(Some(&json!([]))).unwrap_err().to_string(),
            "expected object, got array"
        );
        assert_eq!(values.get_array("items"), vec![json!(1), json!(2)]);
        assert_eq!(values.get_object("owner")["name"], json!("ada"));
    }

    #[test]
    fn test_getters_return_zero_values() {
        let values = Values::new();
        assert!(!values.get_bool("missing"));
        assert_eq!(values.get_int("missing"), 0);
        assert_eq!(values.get_float("missing"), 0.0);
        assert_eq!(values.get_string("missing"), "");
        assert!(values.get_array("missing").is_empty());
        assert!(values.get_object("missing").is_empty());

        values.set_string("name", "x").unwrap();
        assert_eq!(values.get_int("name"), 0);
        assert_eq!(values.get_value("name"), Some(json!("x")));
    }

    #[test]
    #[traced_test]
    fn test_get_int_reads_integral_float_with_warning() {
        let values = Values::new();
        values.set_float("count", 3.0).unwrap();
        assert_eq!(values.get_int("count"), 3);
        assert!(logs_contain("reading float binding as int"));

        values.set_float("ratio", 0.5).unwrap();
        assert_eq!(values.get_int("ratio"), 0);
    }

    #[test]
    fn test_reset_keeps_type() {
        let values = Values::new();
        let flag = values.bind_bool("flag");
        flag.check(Some(&json!(true))).unwrap();
        assert!(flag.check(Some(&json!(false))).is_err());

        values.reset("flag");
        assert!(!values.is_set("flag"));
        assert!(flag.check(Some(&json!(false))).is_ok());
        assert!(values.bind_int("flag").check(Some(&json!(1))).is_err());
        assert_eq!(values.names(), vec!["flag".to_string()]);
    }

    #[test]
    fn test_binding_as_predicate() {
        let values = Values::new();
        let p = Predicate::from(values.bind_float("price"));
        assert!(p.check(Some(&json!(9.5))).is_ok());
        assert!(p.check(Some(&json!(9.5))).is_ok());
        assert!(p.check(Some(&json!(10))).is_err());
    }
}
