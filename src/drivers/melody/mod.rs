//! Nonblocking melody player driver.
//!
//! The driver is polled: call [`MelodyPlayer::play`],
//! [`MelodyPlayer::play_melody`] or [`MelodyPlayer::play_beats`] on every
//! iteration of the main loop. Each poll compares elapsed time against the
//! duration the current note requires at the configured tempo and only
//! touches the hardware on the note boundaries, so the loop stays free for
//! other work while a note is sounding.
//!
//! The one exception to "never blocks" is the inter-note gap configured with
//! [`MelodyPlayer::set_legato`]: it is honored as a synchronous wait of at
//! most 100 ms right after a note is silenced.

use rand_core::RngCore;

use crate::domain::music::{Melody, Note, Pitch, QUARTER_NOTE_64THS, Tempo};
use crate::traits::speaker::PwmSpeaker;
use crate::traits::time::Clock;

/// Note selection policy for melody playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayMode {
    /// Play the notes of the melody in order.
    Normal,
    /// Play uniformly random notes of the melody.
    Random,
}

/// Length of the metronome pulse emitted by [`MelodyPlayer::play_beats`].
const BEAT_PULSE_MS: u32 = 4;

/// Upper bound for the configurable inter-note gap.
const MAX_NOTE_GAP_MS: u32 = 100;

const DEFAULT_NOTE_GAP_MS: u32 = 10;

/// Melody player over a PWM speaker channel.
///
/// Owns its hardware collaborators: the speaker channel, a millisecond
/// clock and an RNG for random play order. A melody is borrowed, not
/// owned; the referenced note table must outlive playback.
pub struct MelodyPlayer<'a, S, C, R>
where
    S: PwmSpeaker,
    C: Clock,
    R: RngCore,
{
    speaker: S,
    clock: C,
    rng: R,
    volume: u32,
    tempo_bpm: u32,
    note_gap_ms: u32,
    mode: PlayMode,
    melody: Option<&'a Melody>,
    index: usize,
    started: bool,
    note_played: bool,
    hold_start: u32,
    last_rearm: u32,
}

impl<'a, S, C, R> MelodyPlayer<'a, S, C, R>
where
    S: PwmSpeaker,
    C: Clock,
    R: RngCore,
{
    /// Create a player with default settings: tempo Moderato (114 BPM),
    /// 10 ms note gap, normal play order, volume 0 (silent until
    /// [`set_volume`](Self::set_volume) is called).
    pub fn new(speaker: S, clock: C, rng: R) -> Self {
        Self {
            speaker,
            clock,
            rng,
            volume: 0,
            tempo_bpm: Tempo::Moderato.bpm(),
            note_gap_ms: DEFAULT_NOTE_GAP_MS,
            mode: PlayMode::Normal,
            melody: None,
            index: 0,
            started: false,
            note_played: false,
            hold_start: 0,
            last_rearm: 0,
        }
    }

    /// Set the volume as a duty cycle value, clamped to the channel's
    /// maximum. Takes effect when the next note starts; a note already
    /// sounding keeps its commanded duty cycle.
    pub fn set_volume(&mut self, volume: u32) {
        let max = self.speaker.max_duty();
        if volume > max {
            warn!("volume {} above channel maximum, clamped to {}", volume, max);
        }
        self.volume = volume.min(max);
    }

    /// Set the tempo in quarter notes per minute, for all subsequently
    /// started notes. 0 is clamped to 1 BPM. Use [`Tempo::bpm`] for the
    /// named presets.
    pub fn set_tempo(&mut self, bpm: u32) {
        if bpm == 0 {
            warn!("tempo 0 bpm is invalid, clamped to 1");
        }
        self.tempo_bpm = bpm.max(1);
    }

    /// Set the silent gap between consecutive notes in milliseconds,
    /// clamped to 0..=100. 0 means back-to-back notes (legato).
    ///
    /// The gap is honored as a synchronous wait after each note; it is
    /// the only point where a poll blocks.
    pub fn set_legato(&mut self, gap_ms: u32) {
        if gap_ms > MAX_NOTE_GAP_MS {
            warn!("note gap {} ms out of range, clamped to {}", gap_ms, MAX_NOTE_GAP_MS);
        }
        self.note_gap_ms = gap_ms.min(MAX_NOTE_GAP_MS);
    }

    /// Set the melody played by [`play`](Self::play). Resets the playback
    /// position, so a melody switch always starts the new melody from its
    /// first note.
    pub fn set_melody(&mut self, melody: &'a Melody) {
        debug!("melody set: {} notes", melody.len());
        self.melody = Some(melody);
        self.index = 0;
        self.started = false;
        self.note_played = false;
    }

    /// Play the notes of the melody in uniformly random order.
    pub fn set_random_mode(&mut self) {
        self.mode = PlayMode::Random;
    }

    /// Play the notes of the melody in order.
    pub fn set_normal_mode(&mut self) {
        self.mode = PlayMode::Normal;
    }

    /// Current note index within the melody.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Silence the output immediately. Sequencing state is untouched; a
    /// melody keeps advancing on subsequent polls.
    pub fn mute(&mut self) -> Result<(), S::Error> {
        self.speaker.set_duty(0)
    }

    /// Advance the note clock by one poll for the given note.
    ///
    /// Returns `Ok(true)` once the note has completed a full cycle
    /// (start, hold, gap). The note is played exactly once: after
    /// completion, further calls are no-ops returning `Ok(true)` until
    /// the player is rearmed with [`rearm_note_after`](Self::rearm_note_after)
    /// or a melody poll starts a new cycle.
    pub fn play_note(&mut self, note: Note) -> Result<bool, S::Error> {
        if self.note_played {
            return Ok(true);
        }
        if !self.started {
            // A rest programs no frequency; keep the channel silent for
            // the duration instead.
            if self.speaker.set_note(note.pitch, note.octave)? {
                self.speaker.set_duty(self.volume)?;
            } else {
                self.speaker.set_duty(0)?;
            }
            self.hold_start = self.clock.now_millis();
            self.started = true;
            return Ok(false);
        }

        let elapsed = self.clock.now_millis().wrapping_sub(self.hold_start);
        if elapsed >= self.hold_ms(note) {
            trace!("note complete after {} ms", elapsed);
            self.speaker.set_duty(0)?;
            self.started = false;
            self.note_played = true;
            if self.note_gap_ms > 0 {
                self.clock.sleep_millis(self.note_gap_ms);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Poll melody playback: play the note at the current position (or a
    /// random one in random mode) and advance the position when it
    /// completes. Past the last note, resets to the first note when
    /// `repeat` is set and is a no-op otherwise.
    pub fn play_melody(&mut self, melody: &Melody, repeat: bool) -> Result<(), S::Error> {
        self.note_played = false;
        if self.index >= melody.len() {
            if repeat {
                self.index = 0;
            }
            return Ok(());
        }
        let note = match self.mode {
            PlayMode::Normal => melody[self.index],
            PlayMode::Random => melody[(self.rng.next_u32() as usize) % melody.len()],
        };
        self.play_note(note)?;
        if self.note_played {
            self.index += 1;
        }
        Ok(())
    }

    /// Poll playback of the melody set with [`set_melody`](Self::set_melody).
    /// Safe no-op when no melody has been set.
    pub fn play(&mut self, repeat: bool) -> Result<(), S::Error> {
        match self.melody {
            Some(melody) => self.play_melody(melody, repeat),
            None => Ok(()),
        }
    }

    /// Poll the metronome: a short high-pitched pulse at the start of
    /// every beat interval derived from the tempo, independent of any
    /// melody.
    pub fn play_beats(&mut self) -> Result<(), S::Error> {
        if !self.started {
            self.speaker.set_note(Pitch::A, 7)?;
            self.speaker.set_duty(self.volume)?;
            self.started = true;
            self.hold_start = self.clock.now_millis();
        }
        let elapsed = self.clock.now_millis().wrapping_sub(self.hold_start);
        if elapsed >= BEAT_PULSE_MS {
            self.mute()?;
        }
        if elapsed >= 60_000 / self.tempo_bpm {
            self.started = false;
        }
        Ok(())
    }

    /// Allow the note last finished by [`play_note`](Self::play_note) to be
    /// played again, if at least `wait_ms` milliseconds have passed since
    /// the previous rearm. Returns whether the player was rearmed.
    pub fn rearm_note_after(&mut self, wait_ms: u32) -> bool {
        let now = self.clock.now_millis();
        if now.wrapping_sub(self.last_rearm) >= wait_ms {
            self.last_rearm = now;
            self.note_played = false;
            true
        } else {
            false
        }
    }

    /// Milliseconds the note must sound at the current tempo.
    fn hold_ms(&self, note: Note) -> u32 {
        60_000 * note.value.in_64ths() / QUARTER_NOTE_64THS / self.tempo_bpm
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::domain::music::NoteValue;
    use crate::testutil::*;

    fn new_player(
        speaker: &TestSpeaker,
        clock: &TestClock,
    ) -> MelodyPlayer<'static, TestSpeaker, TestClock, CountingRng> {
        MelodyPlayer::new(speaker.clone(), clock.clone(), CountingRng::new())
    }

    #[test]
    fn test_note_hold_duration() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(2);
        player.set_tempo(Tempo::Moderato.bpm());
        player.set_legato(0);

        let note = Note::new(Pitch::A, 4, NoteValue::N4);
        // 60000 * 16 / 16 / 114
        assert_eq!(526, player.hold_ms(note));

        assert!(!player.play_note(note).unwrap());
        assert_eq!(
            vec![
                SpeakerCommand::Frequency(Pitch::A, 4),
                SpeakerCommand::Duty(2)
            ],
            speaker.take_commands()
        );

        clock.advance(525);
        assert!(!player.play_note(note).unwrap());
        assert!(speaker.take_commands().is_empty());

        clock.advance(1);
        assert!(player.play_note(note).unwrap());
        assert_eq!(vec![SpeakerCommand::Duty(0)], speaker.take_commands());
    }

    #[test]
    fn test_note_played_only_once() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(1);
        player.set_legato(0);

        let note = Note::new(Pitch::C, 5, NoteValue::N8);
        while !player.play_note(note).unwrap() {
            clock.advance(1);
        }
        speaker.take_commands();

        for _ in 0..10 {
            assert!(player.play_note(note).unwrap());
            clock.advance(1);
        }
        assert!(speaker.take_commands().is_empty());
    }

    #[test]
    fn test_rearm_within_wait_clears_once() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_legato(0);

        let note = Note::new(Pitch::E, 4, NoteValue::N16);
        clock.advance(1000);
        while !player.play_note(note).unwrap() {
            clock.advance(1);
        }

        assert!(player.rearm_note_after(500));
        clock.advance(100);
        assert!(!player.rearm_note_after(500));
        clock.advance(400);
        assert!(player.rearm_note_after(500));
    }

    #[test]
    fn test_rearmed_note_plays_again() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(3);
        player.set_legato(0);

        let note = Note::new(Pitch::G, 4, NoteValue::N16);
        while !player.play_note(note).unwrap() {
            clock.advance(1);
        }
        speaker.take_commands();

        clock.advance(1000);
        assert!(player.rearm_note_after(500));
        assert!(!player.play_note(note).unwrap());
        assert_eq!(
            vec![
                SpeakerCommand::Frequency(Pitch::G, 4),
                SpeakerCommand::Duty(3)
            ],
            speaker.take_commands()
        );
    }

    #[test]
    fn test_rest_keeps_channel_silent() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(100);
        player.set_legato(0);

        let rest = Note::new(Pitch::Rest, 4, NoteValue::N4);
        assert!(!player.play_note(rest).unwrap());
        // No frequency command, duty 0 for the whole duration.
        assert_eq!(vec![SpeakerCommand::Duty(0)], speaker.take_commands());

        clock.advance(526);
        assert!(player.play_note(rest).unwrap());
        assert_eq!(vec![SpeakerCommand::Duty(0)], speaker.take_commands());
    }

    #[test]
    fn test_legato_clamped_and_waited() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_legato(150);

        let note = Note::new(Pitch::D, 4, NoteValue::N32);
        while !player.play_note(note).unwrap() {
            clock.advance(1);
        }
        assert_eq!(vec![100], clock.sleeps());
    }

    #[test]
    fn test_legato_zero_means_no_gap() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_legato(0);

        let note = Note::new(Pitch::D, 4, NoteValue::N32);
        while !player.play_note(note).unwrap() {
            clock.advance(1);
        }
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_tempo_zero_clamped() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_tempo(0);
        // 1 bpm: a quarter note holds a full minute.
        assert_eq!(60_000, player.hold_ms(Note::new(Pitch::A, 4, NoteValue::N4)));
    }

    #[test]
    fn test_volume_clamped_to_max_duty() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(10_000);

        let note = Note::new(Pitch::B, 4, NoteValue::N4);
        player.play_note(note).unwrap();
        assert_eq!(
            vec![
                SpeakerCommand::Frequency(Pitch::B, 4),
                SpeakerCommand::Duty(speaker.max_duty())
            ],
            speaker.take_commands()
        );
    }

    #[test]
    fn test_volume_change_waits_for_next_note() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(5);
        player.set_legato(0);

        let note = Note::new(Pitch::F, 4, NoteValue::N16);
        player.play_note(note).unwrap();
        player.set_volume(9);
        // Holding: no new duty command until the note ends.
        clock.advance(10);
        player.play_note(note).unwrap();
        assert_eq!(
            vec![
                SpeakerCommand::Frequency(Pitch::F, 4),
                SpeakerCommand::Duty(5)
            ],
            speaker.take_commands()
        );
    }

    #[test]
    fn test_mute_silences_without_touching_state() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(7);
        player.set_legato(0);

        let note = Note::new(Pitch::A, 4, NoteValue::N4);
        player.play_note(note).unwrap();
        player.mute().unwrap();
        speaker.take_commands();

        // The note still completes on schedule.
        clock.advance(526);
        assert!(player.play_note(note).unwrap());
    }

    #[test]
    fn test_beats_pulse_per_beat_interval() {
        let speaker = TestSpeaker::new();
        let clock = TestClock::new();
        let mut player = new_player(&speaker, &clock);
        player.set_volume(100);
        player.set_tempo(120);

        // Pulse starts.
        player.play_beats().unwrap();
        assert_eq!(
            vec![
                SpeakerCommand::Frequency(Pitch::A, 7),
                SpeakerCommand::Duty(100)
            ],
            speaker.take_commands()
        );

        // Pulse ends after 4 ms.
        clock.advance(4);
        player.play_beats().unwrap();
        assert_eq!(vec![SpeakerCommand::Duty(0)], speaker.take_commands());

        // Still within the 500 ms beat interval: no new pulse.
        clock.advance(400);
        player.play_beats().unwrap();

        // Next interval: a new pulse starts on the following poll.
        clock.advance(96);
        player.play_beats().unwrap();
        player.play_beats().unwrap();
        let commands = speaker.take_commands();
        assert!(commands.contains(&SpeakerCommand::Frequency(Pitch::A, 7)));
        assert!(commands.contains(&SpeakerCommand::Duty(100)));
    }
}
