use std::{
    any::Any,
    error::Error as StdError,
    fmt::{Debug, Display},
};

/// An error that aborted the simulation.
///
/// The runtime itself does not know the error types of the application
/// it drives, so errors travel as boxed trait objects. Use
/// [`downcast_ref`](RuntimeError::downcast_ref) to recover the concrete
/// type at the call site.
#[must_use]
pub struct RuntimeError {
    inner: Box<dyn LikeRuntimeError>,
}

impl RuntimeError {
    /// Creates a new `RuntimeError` instance.
    pub fn new(inner: impl LikeRuntimeError) -> Self {
        RuntimeError {
            inner: Box::new(inner),
        }
    }

    /// Returns a reference to the contained error, if it is of type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Debug for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RuntimeError({:?})", self.inner)
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T: StdError + Any + 'static> From<T> for RuntimeError {
    fn from(err: T) -> Self {
        RuntimeError {
            inner: Box::new(err),
        }
    }
}

/// A type that can be carried by a [`RuntimeError`].
pub trait LikeRuntimeError: StdError + Any {
    /// Upcast for runtime type recovery.
    fn as_any(&self) -> &dyn Any;
}

impl<T: StdError + Any + 'static> LikeRuntimeError for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
