pub(crate) mod dispose;
pub(crate) mod finalizer;
pub(crate) mod instantiator;
pub(crate) mod pending;
pub(crate) mod registry;
pub(crate) mod service;

pub use dispose::Dispose;
pub use finalizer::Finalizer;
pub use instantiator::Instantiator;
