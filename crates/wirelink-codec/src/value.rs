//! Runtime value model handed to the encoder.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Shared handle to an object-like runtime value.
///
/// Shared `Arc`s may form cycles; the encoder never descends more than one
/// level, so that is harmless.
pub type ObjectRef = Arc<dyn ObjectView>;

/// Failure to read a single property of an object-like value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PropertyError {
    /// Human-readable reason the property could not be read.
    pub message: String,
}

impl PropertyError {
    /// Create a new property error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One level of visible properties of an object-like value.
pub enum Properties {
    /// Array-like: ordered items without names.
    Items(Vec<Result<Value, PropertyError>>),
    /// Object-like: named fields in enumeration order.
    Fields(Vec<(String, Result<Value, PropertyError>)>),
}

/// View over an object-like runtime value.
///
/// Implementations may be lazy, huge, or cyclic. Individual properties may
/// be unreadable; such failures are reported per property and must not
/// poison their siblings.
pub trait ObjectView: Send + Sync {
    /// Best-effort label used when the value is stubbed.
    fn display_name(&self) -> String;

    /// Enumerate the visible properties, one level deep.
    fn properties(&self) -> Properties;
}

/// A dynamic runtime value produced by command evaluation on the remote
/// agent.
#[derive(Clone)]
pub enum Value {
    /// Absent value.
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean primitive.
    Bool(bool),
    /// Numeric primitive.
    Number(f64),
    /// String primitive.
    String(String),
    /// A callable; carries its textual form.
    Function {
        /// Source text or display name of the function.
        source: String,
    },
    /// An error value; carries its message.
    Error {
        /// The error message.
        message: String,
    },
    /// Any other object-like value.
    Object(ObjectRef),
}

impl Value {
    /// Wrap an [`ObjectView`] implementation.
    #[must_use]
    pub fn object(view: impl ObjectView + 'static) -> Self {
        Self::Object(Arc::new(view))
    }

    /// Construct an error value.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Function { source } => write!(f, "Function({source:?})"),
            Self::Error { message } => write!(f, "Error({message:?})"),
            Self::Object(obj) => write!(f, "Object({:?})", obj.display_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<ObjectValue> for Value {
    fn from(obj: ObjectValue) -> Self {
        Self::object(obj)
    }
}

impl From<ArrayValue> for Value {
    fn from(arr: ArrayValue) -> Self {
        Self::object(arr)
    }
}

/// Object-like value with named fields in insertion order.
#[derive(Default, Clone)]
pub struct ObjectValue {
    name: Option<String>,
    fields: Vec<(String, Value)>,
}

impl ObjectValue {
    /// Create an empty, anonymous object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object with a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder-style.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl ObjectView for ObjectValue {
    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "[object]".to_owned())
    }

    fn properties(&self) -> Properties {
        Properties::Fields(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Ok(v.clone())))
                .collect(),
        )
    }
}

/// Array-like value.
#[derive(Default, Clone)]
pub struct ArrayValue(pub Vec<Value>);

impl ArrayValue {
    /// Create an array from items.
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self(items)
    }
}

impl ObjectView for ArrayValue {
    fn display_name(&self) -> String {
        format!("[array({})]", self.0.len())
    }

    fn properties(&self) -> Properties {
        Properties::Items(self.0.iter().cloned().map(Ok).collect())
    }
}

/// Look up one visible property of an object-like value by name.
///
/// Array-like values resolve numeric names against their item index.
#[must_use]
pub fn lookup_property(obj: &ObjectRef, name: &str) -> Option<Result<Value, PropertyError>> {
    match obj.properties() {
        Properties::Items(items) => {
            let index: usize = name.parse().ok()?;
            items.into_iter().nth(index)
        }
        Properties::Fields(fields) => fields
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v),
    }
}
