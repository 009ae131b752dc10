//! Reflex Runtime Object Model
//!
//! This crate provides the live type system the dispatch engine works on:
//! - Dynamically typed [`Value`]s and [`ParamType`] identities
//! - [`Class`] metadata with constructors, overloads and inheritance
//! - [`Object`] instances carrying native state
//! - The [`Interceptor`] contract used by forwarding subtypes
//! - Composite hashing for cache keys

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod error;
pub mod hash;
pub mod intercept;
pub mod method;
pub mod object;
pub mod param;
pub mod value;

pub use class::{Ancestors, Class, ClassBuilder, ClassId, ClassRef, Modifiers, Visibility};
pub use error::{CallResult, ReflectError, ReflectResult};
pub use hash::{deep_hash, djb2_hash, CompositeHasher, NO_PARAM_KEY, NULL_PARAM_KEY};
pub use intercept::{Interceptor, InterceptorView, SuperCall};
pub use method::{Constructor, Method, MethodDescriptor, StateBox};
pub use object::{Instance, Object, ObjectId};
pub use param::{check_arguments, render_signature, ParamType};
pub use value::Value;
