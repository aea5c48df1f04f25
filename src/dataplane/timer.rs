//! Per-endpoint countdown timers
//!
//! Timers count whole ticks. The host advances them once per second through
//! [`Engine::on_tick`](super::Engine::on_tick); an endpoint never looks at
//! wall-clock time.

/// Default time allowed for discovery to complete, in ticks
pub const DEFAULT_CONNECT_TIMEOUT: u32 = 20;

/// Default PADI/PADR retransmission interval, in ticks
pub const DEFAULT_RESEND_INTERVAL: u32 = 3;

/// Default time a ringing endpoint waits for `accept`, in ticks
pub const DEFAULT_RING_TIMEOUT: u32 = 20;

/// Timer reload values for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub connect_timeout: u32,
    pub resend_interval: u32,
    pub ring_timeout: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            resend_interval: DEFAULT_RESEND_INTERVAL,
            ring_timeout: DEFAULT_RING_TIMEOUT,
        }
    }
}

/// A single countdown. Disarmed until [`Countdown::arm`] is called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown(Option<u32>);

impl Countdown {
    /// Start counting down from `ticks` (a zero reload fires on the next tick)
    pub fn arm(&mut self, ticks: u32) {
        self.0 = Some(ticks.max(1));
    }

    pub fn disarm(&mut self) {
        self.0 = None;
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.0
    }

    /// Advance one tick. Returns true on the tick the count reaches zero,
    /// after which the countdown is disarmed.
    pub fn advance(&mut self) -> bool {
        match self.0 {
            Some(1) => {
                self.0 = None;
                true
            }
            Some(n) => {
                self.0 = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

/// Which timers fired on a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expired {
    pub connect: bool,
    pub resend: bool,
    pub ring: bool,
}

impl Expired {
    pub fn any(&self) -> bool {
        self.connect || self.resend || self.ring
    }
}

/// The three countdowns an endpoint can have pending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointTimers {
    /// Whole discovery exchange (Looking + Connecting)
    pub connect: Countdown,
    /// PADI/PADR retransmission
    pub resend: Countdown,
    /// Waiting for the upper layer to accept an incoming session
    pub ring: Countdown,
}

impl EndpointTimers {
    /// Advance every armed timer by one tick
    pub fn advance(&mut self) -> Expired {
        Expired {
            connect: self.connect.advance(),
            resend: self.resend.advance(),
            ring: self.ring.advance(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any_armed(&self) -> bool {
        self.connect.is_armed() || self.resend.is_armed() || self.ring.is_armed()
    }
}
