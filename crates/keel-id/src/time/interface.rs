use core::time::Duration;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
///
/// The default epoch for every generator.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_MS: Duration = Duration::from_millis(0);

/// A source of wall-clock time in **milliseconds since the UNIX epoch**.
///
/// Generators subtract their own epoch from this value, so a single clock can
/// be shared by generators configured with different epochs. Tests plug in a
/// fixed or stepping clock to drive generation deterministically.
///
/// # Example
///
/// ```
/// use keel_id::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the UNIX epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
