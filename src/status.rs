//! Display frame composition.
//!
//! The LCD driver reads three fixed keys from the store and renders one
//! line per key:
//!
//! ```text
//! lcd:0   hostname=<short hostname>
//! lcd:1   <primary IPv4 address, empty if none>
//! lcd:2   YYYY/MM/DD HH:MM   (":" on even ticks, " " on odd ticks)
//! ```
//!
//! Every publish fully replaces all three values. The tick counter only
//! drives the clock separator.

use chrono::NaiveDateTime;

/// Store key for the hostname line
pub const KEY_HOSTNAME: &str = "lcd:0";

/// Store key for the IPv4 address line
pub const KEY_ADDRESS: &str = "lcd:1";

/// Store key for the clock line
pub const KEY_CLOCK: &str = "lcd:2";

/// Build the clock line for one tick.
///
/// The separator between hours and minutes alternates each tick so the
/// display blinks once per publish period.
pub fn clock_line(now: NaiveDateTime, tick: u64) -> String {
    let separator = if tick % 2 == 0 { ':' } else { ' ' };
    format!("{}{}{}", now.format("%Y/%m/%d %H"), separator, now.format("%M"))
}

/// One complete set of display values, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    /// Value for `lcd:0`
    pub hostname: String,
    /// Value for `lcd:1` (empty when no address was found)
    pub address: String,
    /// Value for `lcd:2`
    pub clock: String,
}

impl StatusFrame {
    /// Compose a frame from the gathered host facts and the current tick.
    pub fn compose(hostname: &str, address: &str, now: NaiveDateTime, tick: u64) -> Self {
        Self {
            hostname: format!("hostname={hostname}"),
            address: address.to_string(),
            clock: clock_line(now, tick),
        }
    }

    /// The three `(key, value)` pairs in key order.
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            (KEY_HOSTNAME, self.hostname.as_str()),
            (KEY_ADDRESS, self.address.as_str()),
            (KEY_CLOCK, self.clock.as_str()),
        ]
    }
}
