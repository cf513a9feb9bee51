//! txwx-core: Pure codec + station state library for the weather uplink.
//!
//! No async and no network I/O: framing and validation plus the shared
//! state objects the station tasks hand around. Used by both the `txwx`
//! transmitter and the `rxwx` receiver.

pub mod beacon;
pub mod cache;
pub mod config;
pub mod crc;
pub mod geo;
pub mod message;
pub mod packet;
pub mod position;
pub mod receive;
pub mod types;
pub mod uplink;

// Re-export commonly used types at crate root
pub use cache::{WeatherCache, WeatherSnapshot};
pub use packet::{decode, encode, Packet};
pub use position::StationTracker;
pub use receive::{RxEvent, RxPipeline};
pub use types::*;
