//! txwx-station: tokio runtime for the weather uplink ground station.
//!
//! Wires the pure `txwx-core` state objects to the outside world: the UDP
//! modem bridge, the aviation weather service, the local situation
//! (position) service, the receive log, and the downstream text encoder.
//! The `txwx` and `rxwx` binaries assemble these into the transmit and
//! receive stations.

pub mod downstream;
pub mod logging;
pub mod radio;
pub mod receive;
pub mod situation;
pub mod stats;
pub mod sync;
pub mod transmit;
pub mod weather;
