//! Parameters - mutable key/value filters carried by models and collections.
//!
//! Parameters feed the URL builder (path placeholders and query strings).
//! Every effective change emits two notifications, `change:<name>` and the
//! wildcard `change`, each carrying a [`ParamChange`], so views can re-fetch
//! when a filter moves.

mod value;

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::event_emitter::{EventEmitter, ListenerId};

pub use value::ParamValue;

/// A snapshot of parameter values. Absent keys are unset.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Name carried by the notification emitted from `clear_params`.
pub const ALL_PARAMS: &str = "*";

const CHANGE_EVENT: &str = "change";

/// Payload of a parameter change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub name: String,
    pub old: Option<ParamValue>,
    pub new: Option<ParamValue>,
}

/// Parameter storage plus its change emitter.
#[derive(Default)]
pub struct Params {
    values: RwLock<ParamMap>,
    emitter: EventEmitter,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.read().get(name).cloned()
    }

    pub fn snapshot(&self) -> ParamMap {
        self.read().clone()
    }

    /// Set `name`. Returns false (and emits nothing) when the value is unchanged.
    pub fn set(&self, name: &str, value: ParamValue) -> bool {
        self.replace(name, Some(value))
    }

    /// Unset `name`. Returns false when it was not set.
    pub fn unset(&self, name: &str) -> bool {
        self.replace(name, None)
    }

    pub fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::trace!("params cleared");
        self.emitter.emit(
            CHANGE_EVENT,
            &ParamChange {
                name: ALL_PARAMS.to_string(),
                old: None,
                new: None,
            },
        );
    }

    /// Listen to changes of one parameter, or of all of them when `name` is `None`.
    pub fn on_change<F>(&self, name: Option<&str>, listener: F) -> ListenerId
    where
        F: Fn(&ParamChange) + Send + Sync + 'static,
    {
        self.emitter.on(event_name(name), move |data| {
            if let Some(change) = data.downcast_ref::<ParamChange>() {
                listener(change);
            }
        })
    }

    pub fn remove_listener(&self, name: Option<&str>, id: ListenerId) -> bool {
        self.emitter.remove_listener(&event_name(name), id)
    }

    fn replace(&self, name: &str, value: Option<ParamValue>) -> bool {
        let old = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            if values.get(name) == value.as_ref() {
                return false;
            }
            match &value {
                Some(value) => values.insert(name.to_string(), value.clone()),
                None => values.remove(name),
            }
        };

        tracing::trace!(param = name, ?old, new = ?value, "param changed");
        let change = ParamChange {
            name: name.to_string(),
            old,
            new: value,
        };
        self.emitter.emit(&event_name(Some(name)), &change);
        self.emitter.emit(CHANGE_EVENT, &change);
        true
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ParamMap> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn event_name(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{}:{}", CHANGE_EVENT, name),
        None => CHANGE_EVENT.to_string(),
    }
}

/// Parameter-bearing capability shared by models and collections.
pub trait HasParams {
    fn param_store(&self) -> &Params;

    fn params(&self) -> ParamMap {
        self.param_store().snapshot()
    }

    fn param(&self, name: &str) -> Option<ParamValue> {
        self.param_store().get(name)
    }

    fn set_param(&self, name: &str, value: impl Into<ParamValue>) -> bool
    where
        Self: Sized,
    {
        self.param_store().set(name, value.into())
    }

    fn unset_param(&self, name: &str) -> bool {
        self.param_store().unset(name)
    }

    fn clear_params(&self) {
        self.param_store().clear()
    }

    fn on_param_change<F>(&self, name: Option<&str>, listener: F) -> ListenerId
    where
        Self: Sized,
        F: Fn(&ParamChange) + Send + Sync + 'static,
    {
        self.param_store().on_change(name, listener)
    }
}
