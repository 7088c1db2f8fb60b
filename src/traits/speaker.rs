use crate::domain::music::Pitch;

/// A PWM channel wired to a speaker or piezo buzzer.
///
/// Pin attachment, PWM channel selection, base frequency and duty
/// resolution are fixed when the concrete peripheral is constructed;
/// the player only changes frequency and duty cycle at runtime.
pub trait PwmSpeaker {
    type Error;

    /// Program the output frequency for the given pitch and octave.
    ///
    /// Returns `Ok(false)` when the pitch is [`Pitch::Rest`], in which
    /// case no frequency was programmed and the caller is expected to
    /// keep the output silent.
    fn set_note(&mut self, pitch: Pitch, octave: u8) -> Result<bool, Self::Error>;

    /// Set the output duty cycle. 0 silences the output.
    fn set_duty(&mut self, duty: u32) -> Result<(), Self::Error>;

    /// The largest duty value the channel accepts; volume settings are
    /// clamped to this.
    fn max_duty(&self) -> u32;
}
