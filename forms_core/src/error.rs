use crate::platform::NativeError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The platform refused to create a native window. The control is left
    /// without a handle and creation may be retried.
    #[error("failed to create native window: {0}")]
    HandleCreation(NativeError),

    #[error("native call failed: {0}")]
    Native(#[from] NativeError),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("value {value} is not valid for enum {name}")]
    InvalidEnumArgument { name: &'static str, value: i32 },

    #[error("cannot access a disposed object: {0}")]
    Disposed(&'static str),

    /// The thread that owns the marshaling control's handle went away while
    /// a caller was waiting for an invocation to complete.
    #[error("the affinity thread exited before the invocation completed")]
    AffinityThreadExited,
}

pub type Result<T> = core::result::Result<T, Error>;
