//! Form value provider contract consumed by edit sessions.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Supplies and accepts the editable value of an open lens.
///
/// The provider is the sole authority on validity and dirty state; sessions
/// only read the live value and hand values back through
/// [`FormValueProvider::apply_value`].
pub trait FormValueProvider<V>: Send + Sync {
    /// Current live value of the form.
    fn current_value(&self) -> V;

    /// Current validity; `None` means validity is not determined yet.
    fn current_validity(&self) -> Option<bool>;

    /// Replace the form content with `value`.
    fn apply_value(&self, value: V);
}

type Validator<V> = Box<dyn Fn(&V) -> bool + Send + Sync>;

struct FormInner<V> {
    value: V,
    validator: Option<Validator<V>>,
    applied: usize,
}

/// In-memory form backed by a mutex-guarded value.
///
/// Validity stays undetermined until a validator is installed.
pub struct FormState<V> {
    inner: Mutex<FormInner<V>>,
}

impl<V> FormState<V> {
    /// Create a form holding `value` with no validator.
    pub fn new(value: V) -> Self {
        Self {
            inner: Mutex::new(FormInner {
                value,
                validator: None,
                applied: 0,
            }),
        }
    }

    /// Install a validator, replacing any previous one.
    pub fn with_validator(self, validator: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        self.set_validator(validator);
        self
    }

    /// Install a validator on an existing form.
    pub fn set_validator(&self, validator: impl Fn(&V) -> bool + Send + Sync + 'static) {
        self.inner().validator = Some(Box::new(validator));
    }

    /// Replace the value as a user edit would.
    ///
    /// Unlike [`FormValueProvider::apply_value`] this does not count as a
    /// programmatic reset.
    pub fn set_value(&self, value: V) {
        self.inner().value = value;
    }

    /// Number of programmatic resets applied through the provider contract.
    pub fn applied_count(&self) -> usize {
        self.inner().applied
    }

    fn inner(&self) -> MutexGuard<'_, FormInner<V>> {
        // A panicking validator cannot leave the value half-written.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V> FormValueProvider<V> for FormState<V>
where
    V: Clone + Send,
{
    fn current_value(&self) -> V {
        self.inner().value.clone()
    }

    fn current_validity(&self) -> Option<bool> {
        let inner = self.inner();
        inner.validator.as_ref().map(|validate| validate(&inner.value))
    }

    fn apply_value(&self, value: V) {
        let mut inner = self.inner();
        inner.value = value;
        inner.applied += 1;
    }
}

impl<V: fmt::Debug> fmt::Debug for FormState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner();
        f.debug_struct("FormState")
            .field("value", &inner.value)
            .field("has_validator", &inner.validator.is_some())
            .field("applied", &inner.applied)
            .finish()
    }
}
