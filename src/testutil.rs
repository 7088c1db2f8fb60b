//! Simulated hardware for testing the melody player without a PWM
//! peripheral: a speaker that records every command it receives and a
//! clock driven manually by the test.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand_core::RngCore;

use crate::domain::music::{Melody, Note, NoteValue, Pitch};
use crate::traits::speaker::PwmSpeaker;
use crate::traits::time::Clock;

/// A command issued to the simulated speaker channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakerCommand {
    /// Frequency programmed for a pitch and octave.
    Frequency(Pitch, u8),
    /// Duty cycle set; 0 is silence.
    Duty(u32),
}

/// Simulated PWM speaker recording the commands it receives.
///
/// Cloning yields another handle onto the same command log, so a test
/// can keep one handle while the player owns the other.
#[derive(Clone)]
pub struct TestSpeaker {
    commands: Rc<RefCell<Vec<SpeakerCommand>>>,
    max_duty: u32,
}

impl TestSpeaker {
    /// 10 bit resolution at 50% maximum pulse width (duty 0..511), as
    /// on an ESP32 ledc channel driving a buzzer.
    pub fn new() -> Self {
        Self {
            commands: Rc::new(RefCell::new(Vec::new())),
            max_duty: 511,
        }
    }

    /// All commands received so far.
    pub fn commands(&self) -> Vec<SpeakerCommand> {
        self.commands.borrow().clone()
    }

    /// Drain and return the commands received so far.
    pub fn take_commands(&self) -> Vec<SpeakerCommand> {
        self.commands.borrow_mut().drain(..).collect()
    }
}

impl Default for TestSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmSpeaker for TestSpeaker {
    type Error = core::convert::Infallible;

    fn set_note(&mut self, pitch: Pitch, octave: u8) -> Result<bool, Self::Error> {
        if pitch.is_rest() {
            return Ok(false);
        }
        self.commands
            .borrow_mut()
            .push(SpeakerCommand::Frequency(pitch, octave));
        Ok(true)
    }

    fn set_duty(&mut self, duty: u32) -> Result<(), Self::Error> {
        self.commands.borrow_mut().push(SpeakerCommand::Duty(duty));
        Ok(())
    }

    fn max_duty(&self) -> u32 {
        self.max_duty
    }
}

/// Simulated millisecond clock, advanced manually with
/// [`TestClock::advance`]. Sleeps are recorded and advance the clock.
#[derive(Clone)]
pub struct TestClock {
    now: Rc<Cell<u32>>,
    sleeps: Rc<RefCell<Vec<u32>>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            sleeps: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Start the clock close to the u32 boundary to exercise timestamp
    /// wraparound.
    pub fn new_near_wrap() -> Self {
        let clock = Self::new();
        clock.now.set(u32::MAX - 100);
        clock
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Durations passed to `sleep_millis` so far.
    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }

    fn sleep_millis(&mut self, ms: u32) {
        self.sleeps.borrow_mut().push(ms);
        self.advance(ms);
    }
}

/// Deterministic RNG yielding 0, 1, 2, ... — enough for tests that do
/// not exercise random play order.
pub struct CountingRng(u32);

impl CountingRng {
    pub fn new() -> Self {
        Self(0)
    }
}

impl Default for CountingRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.0;
        self.0 = self.0.wrapping_add(1);
        value
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Six-note scale fixture, all distinct pitches.
pub const SCALE: &Melody = &[
    Note::new(Pitch::C, 4, NoteValue::N4),
    Note::new(Pitch::D, 4, NoteValue::N4),
    Note::new(Pitch::E, 4, NoteValue::N4),
    Note::new(Pitch::G, 4, NoteValue::N4),
    Note::new(Pitch::A, 4, NoteValue::N4),
    Note::new(Pitch::B, 4, NoteValue::N4),
];

/// Two-note siren fixture.
pub const SIREN: &Melody = &[
    Note::new(Pitch::Cs, 4, NoteValue::N4),
    Note::new(Pitch::Gs, 4, NoteValue::N4),
];
