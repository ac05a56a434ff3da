//! Self-describing wire representation of encoded values.
//!
//! Primitives pass through as bare JSON; everything lossy or non-JSON
//! (stubs, functions, `undefined`, errors, truncated strings) is carried as
//! a marker object with a reserved `__wirelink` numeric tag, so real
//! property names can never collide with the markers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker tag for an object stub.
const TAG_OBJECT_STUB: u8 = 0;
/// Marker tag for a function.
const TAG_FUNCTION: u8 = 1;
/// Marker tag for `undefined`.
const TAG_UNDEFINED: u8 = 2;
/// Marker tag for a remote error.
const TAG_ERROR: u8 = 3;
/// Marker tag for a truncated string.
const TAG_TRUNCATED: u8 = 4;

/// A non-primitive wire marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MarkerWire", into = "MarkerWire")]
pub enum Marker {
    /// Stand-in for an object-like value that was not transmitted.
    ObjectStub {
        /// Best-effort display name of the stubbed value.
        name: String,
    },
    /// A function value; only its textual form travels.
    Function {
        /// Source text or display name.
        name: String,
    },
    /// The `undefined` value.
    Undefined,
    /// An error raised on the remote side.
    Error {
        /// The error message.
        message: String,
    },
    /// A string cut down to its fixed-length prefix.
    TruncatedString {
        /// The retained prefix.
        intro: String,
    },
}

/// Flat serde shape of a marker: `{ "__wirelink": <tag>, ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkerWire {
    #[serde(rename = "__wirelink")]
    tag: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    intro: Option<String>,
}

impl From<Marker> for MarkerWire {
    fn from(marker: Marker) -> Self {
        let (tag, name, message, intro) = match marker {
            Marker::ObjectStub { name } => (TAG_OBJECT_STUB, Some(name), None, None),
            Marker::Function { name } => (TAG_FUNCTION, Some(name), None, None),
            Marker::Undefined => (TAG_UNDEFINED, None, None, None),
            Marker::Error { message } => (TAG_ERROR, None, Some(message), None),
            Marker::TruncatedString { intro } => (TAG_TRUNCATED, None, None, Some(intro)),
        };
        Self {
            tag,
            name,
            message,
            intro,
        }
    }
}

impl TryFrom<MarkerWire> for Marker {
    type Error = String;

    fn try_from(wire: MarkerWire) -> Result<Self, String> {
        match wire.tag {
            TAG_OBJECT_STUB => Ok(Marker::ObjectStub {
                name: wire.name.ok_or("object stub marker missing name")?,
            }),
            TAG_FUNCTION => Ok(Marker::Function {
                name: wire.name.ok_or("function marker missing name")?,
            }),
            TAG_UNDEFINED => Ok(Marker::Undefined),
            TAG_ERROR => Ok(Marker::Error {
                message: wire.message.ok_or("error marker missing message")?,
            }),
            TAG_TRUNCATED => Ok(Marker::TruncatedString {
                intro: wire.intro.ok_or("truncated string marker missing intro")?,
            }),
            other => Err(format!("unknown marker tag {other}")),
        }
    }
}

/// The bounded wire form of a runtime value.
///
/// Composites hold their immediate members; members that are themselves
/// object-like always appear as [`Marker::ObjectStub`], never as nested
/// composites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedValue {
    /// Marker objects; tried first so the reserved tag wins over plain maps.
    Marker(Marker),
    /// JSON null.
    Null,
    /// Boolean passed through as-is.
    Bool(bool),
    /// Number passed through as-is.
    Number(f64),
    /// String passed through as-is.
    String(String),
    /// Array-like composite.
    Array(Vec<EncodedValue>),
    /// Object-like composite, property order preserved.
    Object(IndexMap<String, EncodedValue>),
}

impl EncodedValue {
    /// Shorthand for an object stub marker.
    #[must_use]
    pub fn stub(name: impl Into<String>) -> Self {
        Self::Marker(Marker::ObjectStub { name: name.into() })
    }

    /// Shorthand for an error marker.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Marker(Marker::Error {
            message: message.into(),
        })
    }
}
