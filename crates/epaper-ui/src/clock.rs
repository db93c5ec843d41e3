//! Monotonic time source

/// Milliseconds since an arbitrary, fixed origin
///
/// Must never go backwards. Used to bound busy waits and to detect idle
/// periods between flushes.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
