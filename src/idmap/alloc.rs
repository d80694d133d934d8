//! Fallible allocation of trie slot arrays.
//!
//! Boxes and vectors abort the process when the allocator fails. Slot arrays
//! instead go through `Vec::try_reserve_exact`, so that an exhausted
//! allocator surfaces as an [`AllocationError`] the caller can propagate.

use crate::error::AllocationError;

/// Allocates a boxed array of `N` slots, filling slot `i` with `fill(i)`.
pub(crate) fn try_boxed_array<T, const N: usize>(
    mut fill: impl FnMut(usize) -> T,
) -> Result<Box<[T; N]>, AllocationError> {
    fault::check()?;

    let mut slots = Vec::new();
    slots
        .try_reserve_exact(N)
        .map_err(|_| AllocationError)?;
    slots.extend((0..N).map(&mut fill));

    slots
        .into_boxed_slice()
        .try_into()
        .map_err(|_| AllocationError)
}

/// Moves `value` into a freshly allocated one-slot array.
///
/// On failure `value` is dropped together with the error.
pub(crate) fn try_boxed_one<T>(value: T) -> Result<Box<[T; 1]>, AllocationError> {
    fault::check()?;

    let mut slot = Vec::new();
    slot.try_reserve_exact(1).map_err(|_| AllocationError)?;
    slot.push(value);

    slot.into_boxed_slice()
        .try_into()
        .map_err(|_| AllocationError)
}

/// Reserves room for `additional` more elements in `vec`.
pub(crate) fn try_reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), AllocationError> {
    fault::check()?;
    vec.try_reserve_exact(additional).map_err(|_| AllocationError)
}

#[cfg(not(test))]
mod fault {
    use crate::error::AllocationError;

    #[inline(always)]
    pub(super) const fn check() -> Result<(), AllocationError> {
        Ok(())
    }
}

/// Allocation fault injection for unit tests.
///
/// `fail_after(n)` lets the next `n` allocations on the current thread
/// succeed and fails every one after that until [`reset`] is called.
#[cfg(test)]
pub(crate) mod fault {
    use std::cell::Cell;

    use crate::error::AllocationError;

    thread_local! {
        static REMAINING: Cell<Option<usize>> = const { Cell::new(None) };
    }

    pub(crate) fn fail_after(successes: usize) {
        REMAINING.with(|remaining| remaining.set(Some(successes)));
    }

    pub(crate) fn reset() {
        REMAINING.with(|remaining| remaining.set(None));
    }

    pub(super) fn check() -> Result<(), AllocationError> {
        REMAINING.with(|remaining| match remaining.get() {
            None => Ok(()),
            Some(0) => Err(AllocationError),
            Some(left) => {
                remaining.set(Some(left - 1));
                Ok(())
            }
        })
    }

    /// Resets the injector when dropped, so a failing assertion cannot leak
    /// a fault into the next test on the same thread.
    pub(crate) struct Guard;

    impl Guard {
        pub(crate) fn fail_after(successes: usize) -> Self {
            fail_after(successes);
            Self
        }
    }

    impl Drop for Guard {
        fn drop(&mut self) {
            reset();
        }
    }
}
