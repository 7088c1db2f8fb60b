#![macro_use]
#![cfg_attr(not(feature = "std"), no_std)]
//! A nonblocking melody player for PWM-driven speakers and piezo buzzers.
//!
//! The [`drivers::melody::MelodyPlayer`] driver turns a sequence of notes
//! (pitch, octave, duration) into PWM frequency and duty-cycle changes over
//! time. It never spawns a task and never blocks between notes: the
//! application polls one of the play entry points from its main loop, and the
//! driver advances its internal note clock by comparing elapsed milliseconds
//! against the duration the current note requires at the configured tempo.
//!
//! Hardware access goes through the [`traits::PwmSpeaker`] and
//! [`traits::Clock`] traits so the driver runs unchanged on any PWM
//! peripheral, and against simulated hardware in tests.
//!
//! # Example
//!
//! ```ignore
//! use melody_player::domain::music::*;
//! use melody_player::drivers::melody::MelodyPlayer;
//!
//! static JINGLE: &Melody = &[
//!     Note::new(Pitch::E, 4, NoteValue::N8),
//!     Note::new(Pitch::G, 4, NoteValue::N8),
//!     Note::new(Pitch::A, 4, NoteValue::N4),
//! ];
//!
//! let mut player = MelodyPlayer::new(speaker, clock, rng);
//! player.set_volume(2);
//! player.set_tempo(Tempo::Allegro.bpm());
//! player.set_melody(JINGLE);
//! loop {
//!     player.play(true)?;
//!     // ... other loop work; the player only acts when a note is due
//! }
//! ```

pub(crate) mod fmt;

pub mod domain;

pub mod traits;

pub mod drivers;

#[cfg(feature = "std")]
pub mod testutil;
