//! Types and constants describing notes, melodies and tempo.

/// A pitch class on the twelve-tone scale, or [`Pitch::Rest`] for silence.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pitch {
    C,
    Cs,
    D,
    Eb,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    Bb,
    B,
    /// Sentinel pitch: silence for the duration of the note.
    Rest,
}

impl Pitch {
    pub fn is_rest(&self) -> bool {
        *self == Pitch::Rest
    }
}

/// Relative note duration, as its weight in 64ths of a whole note.
/// A `d` suffix denotes a dotted value (1.5 times the plain one).
///
/// Example: `N4d` is a dotted quarter note, `N2` is a half note.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NoteValue {
    N64 = 1,
    N32 = 2,
    N32d = 3,
    N16 = 4,
    N16d = 6,
    N8 = 8,
    N8d = 12,
    N4 = 16,
    N4d = 24,
    N2 = 32,
    N2d = 48,
    N1 = 64,
    N1d = 96,
}

impl NoteValue {
    /// Duration weight in 64ths of a whole note. Always > 0.
    pub const fn in_64ths(self) -> u32 {
        self as u32
    }
}

/// Reference weight of a quarter note in 64ths, used to scale note
/// durations against the tempo (quarter notes per minute).
pub const QUARTER_NOTE_64THS: u32 = 16;

/// A single note: pitch class, octave and relative duration.
///
/// Example: `Note::new(Pitch::A, 4, NoteValue::N4d)` is the concert
/// pitch 440 Hz held for a dotted quarter note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Note {
    pub pitch: Pitch,
    pub octave: u8,
    pub value: NoteValue,
}

impl Note {
    pub const fn new(pitch: Pitch, octave: u8, value: NoteValue) -> Self {
        Self {
            pitch,
            octave,
            value,
        }
    }
}

/// An ordered, finite sequence of notes. Melodies are borrowed by the
/// player, never owned; define them as `static` or `const` tables.
pub type Melody = [Note];

/// Named tempo presets, as quarter notes per minute.
///
/// [`MelodyPlayer::set_tempo`](crate::drivers::melody::MelodyPlayer::set_tempo)
/// takes a plain BPM integer; resolve a preset with [`Tempo::bpm`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tempo {
    Largo = 50,
    Larghetto = 63,
    Adagio = 71,
    Andante = 92,
    Moderato = 114,
    Allegro = 144,
    Presto = 184,
    Prestissimo = 204,
}

impl Tempo {
    /// The preset's beats per minute.
    pub const fn bpm(self) -> u32 {
        self as u32
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> u32 {
        tempo.bpm()
    }
}
