#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[macro_use]
pub(crate) mod registry_macros;

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod dispose;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod service;

#[cfg(feature = "async")]
pub(crate) mod utils;

#[cfg(feature = "async")]
pub mod async_impl;

#[cfg(feature = "std")]
pub mod global;

pub use any::TypeInfo;
pub use dispose::Dispose;
pub use errors::{FinalizeErrorKind, InstantiateErrorKind, ResolveErrorKind};
pub use finalizer::{Finalizer, IntoFinalizeResult};
pub use instantiator::{instance, FromRegistry, Instantiator};
pub use key::{Key, Name};
pub use provider::Provider;
pub use registry::Registry;

#[cfg(feature = "std")]
pub use global::global;
