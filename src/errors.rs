mod finalize;
mod instantiate;
mod resolve;

pub use finalize::FinalizeErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use resolve::ResolveErrorKind;
