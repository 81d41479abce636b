use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Name of a registration slot. Registrations without a name use the default slot of their type.
pub type Name = Cow<'static, str>;

/// Identifies a registration slot: the requested type and an optional instance name.
///
/// Two keys are equal only if both the type and the name match,
/// so instances registered under different names of the same type are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub type_info: TypeInfo,
    pub name: Option<Name>,
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of<Dep: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<Dep>(),
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<Dep: ?Sized + 'static>(name: impl Into<Name>) -> Self {
        Self {
            type_info: TypeInfo::of::<Dep>(),
            name: Some(name.into()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn new<Dep: ?Sized + 'static>(name: Option<Name>) -> Self {
        Self {
            type_info: TypeInfo::of::<Dep>(),
            name,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (name: {name:?})", self.type_info),
            None => write!(f, "{}", self.type_info),
        }
    }
}
