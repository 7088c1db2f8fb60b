/// Millisecond time source for the note clock.
///
/// `now_millis` may wrap; the player only ever compares timestamps with
/// wrapping subtraction, so wraparound mid-session is harmless as long
/// as no single note lasts anywhere near `u32::MAX` milliseconds.
pub trait Clock {
    /// Milliseconds elapsed since some fixed point (boot, typically).
    fn now_millis(&self) -> u32;

    /// Busy-wait for the given number of milliseconds.
    ///
    /// Only used for the bounded inter-note gap (at most 100 ms); see
    /// [`MelodyPlayer::set_legato`](crate::drivers::melody::MelodyPlayer::set_legato).
    fn sleep_millis(&mut self, ms: u32);
}
