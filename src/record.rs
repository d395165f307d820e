//! Opaque record values produced by query operations.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

/// Types that know their own human-readable identifier.
///
/// Implement this for domain objects with an id field so reporters can
/// name failing records by id instead of by their debug representation.
pub trait Identify {
    fn record_id(&self) -> String;
}

/// A record handed from a query operation to each check operation.
///
/// Cloning is cheap; the value is shared.
#[derive(Clone)]
pub struct Record {
    value: Rc<dyn Any>,
    id: String,
    type_name: &'static str,
}

impl Record {
    /// Wrap a value, using its `Debug` output as the record id.
    ///
    /// Strings keep their quotes; use [`Record::display`] for bare text.
    pub fn new<T: Any + fmt::Debug>(value: T) -> Self {
        let id = format!("{:?}", value);
        Self::with_id(id, value)
    }

    /// Wrap a value, using its `Display` output as the record id.
    pub fn display<T: Any + fmt::Display>(value: T) -> Self {
        let id = value.to_string();
        Self::with_id(id, value)
    }

    /// Wrap a value that carries its own identifier.
    pub fn identified<T: Any + Identify>(value: T) -> Self {
        let id = value.record_id();
        Self::with_id(id, value)
    }

    /// Wrap a value with an explicit identifier.
    pub fn with_id<T: Any>(id: impl Into<String>, value: T) -> Self {
        Self {
            value: Rc::new(value),
            id: id.into(),
            type_name: type_name::<T>(),
        }
    }

    /// Human-readable identifier for reports.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the wrapped value's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
