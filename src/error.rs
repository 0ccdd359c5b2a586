use dioxus::prelude::BorrowMutError;

use crate::utils::CCStr;

/// Failure to apply an update to a slot's instance list.
///
/// These never reach the caller of [`Awaitable::render`](crate::Awaitable::render):
/// the update is dropped and the error logged, since writing into a torn-down
/// placeholder is not something the calling code can act upon.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The placeholder owning the list has been unmounted
    #[error("slot {slot} is no longer mounted")]
    Unmounted { slot: CCStr },
    /// The list is borrowed elsewhere (e.g. read during a render in progress)
    #[error("slot {slot} instance list is busy: {source}")]
    Busy {
        slot: CCStr,
        #[source]
        source: BorrowMutError,
    },
}

impl DispatchError {
    pub(crate) fn from_borrow(slot: CCStr, error: BorrowMutError) -> Self {
        match error {
            BorrowMutError::Dropped(_) => Self::Unmounted { slot },
            source => Self::Busy { slot, source },
        }
    }
}
