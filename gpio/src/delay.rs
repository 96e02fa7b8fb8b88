use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// Blocking delay source.
///
/// Implementations must wait at least as long as requested. There is no way to abort a delay.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// Delays by putting the calling thread to sleep.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        sleep(duration);
    }
}
