/// Error returned by an instantiator.
///
/// Wraps the producer's error unchanged, so it can be recovered with [`anyhow::Error::downcast_ref`].
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
