pub mod speaker;
pub mod time;

pub use speaker::PwmSpeaker;
pub use time::Clock;
