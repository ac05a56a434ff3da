//! Bounded value encoding for Wirelink.
//!
//! This crate provides the pieces that keep arbitrary runtime values safe to
//! put on the wire:
//! - `Value` / `ObjectView` - the runtime value model handed to the encoder
//! - `encode` - one-level-deep, lossy encoding into `EncodedValue`
//! - `EncodedValue` / `Marker` - the self-describing wire representation
//! - `expand_command` - follow-up command construction for stub expansion

pub mod encode;
pub mod expansion;
pub mod value;
pub mod wire;

pub use encode::{STRING_PREVIEW_LEN, encode};
pub use expansion::expand_command;
pub use value::{
    ArrayValue, ObjectRef, ObjectValue, ObjectView, Properties, PropertyError, Value,
    lookup_property,
};
pub use wire::{EncodedValue, Marker};
