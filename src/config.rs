use core::time::Duration;

/// Receiver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Largest payload accepted before the packet is dropped as an overflow.
    pub max_payload: u8,
    /// Drop a packet that is still incomplete this long after its STX.
    /// `None` waits forever.
    pub packet_timeout: Option<Duration>,
}

impl Config {
    pub const fn new() -> Config {
        Config {
            max_payload: u8::MAX,
            packet_timeout: None,
        }
    }

    pub const fn with_max_payload(mut self, max_payload: u8) -> Config {
        self.max_payload = max_payload;
        self
    }

    pub const fn with_packet_timeout(mut self, timeout: Duration) -> Config {
        self.packet_timeout = Some(timeout);
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}
