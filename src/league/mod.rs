//! The league domain: models, the standings/recap aggregation core, and
//! the public pages.

pub mod games;
pub mod players;
pub mod potw;
pub mod reactions;
pub mod recap;
pub mod rsvps;
pub mod schedule;
pub mod settings;
pub mod standings;
pub mod stats;
pub mod teams;

pub use games::Game;
pub use players::Player;
pub use teams::Team;
