use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::AlertLevel;
use crate::clock::{Clock, TimerCell, TimerHandle, TimerSlot, display_time, elapsed_between};
use crate::config::LivenessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessSettings {
    /// Keepalive window. One miss is counted per elapsed window.
    pub window: Duration,
    /// Misses tolerated before a resync is forced.
    pub max_missed: u32,
    /// Silence that forces a resync regardless of the miss count.
    pub hard_ceiling: Duration,
}

impl LivenessSettings {
    pub fn from_config(config: &LivenessConfig) -> Self {
        Self {
            window: config.window(),
            max_missed: config.max_missed(),
            hard_ceiling: config.hard_ceiling(),
        }
    }
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self::from_config(&LivenessConfig::default())
    }
}

/// Connection status line shown above the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub level: AlertLevel,
    pub message: String,
}

impl Banner {
    pub fn connected() -> Self {
        Self {
            level: AlertLevel::Green,
            message: String::new(),
        }
    }

    pub fn silent_since(last_keepalive: DateTime<Utc>) -> Self {
        Self {
            level: AlertLevel::Stale,
            message: format!("ERROR: No keepalives since {}.", display_time(last_keepalive)),
        }
    }
}

/// Why the board dropped its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResyncReason {
    ServerRequested,
    MissedKeepalives { count: u32 },
    Silence { elapsed_secs: u64 },
}

impl fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResyncReason::ServerRequested => write!(f, "server requested a reload"),
            ResyncReason::MissedKeepalives { count } => {
                write!(f, "{} consecutive keepalive windows missed", count)
            }
            ResyncReason::Silence { elapsed_secs } => {
                write!(f, "no keepalive for {}s", elapsed_secs)
            }
        }
    }
}

/// Result of a liveness timer firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessOutcome {
    /// The handle was not the live timer.
    Superseded,
    /// A window passed without a keepalive. Carries the banner if it changed.
    Missed(Option<Banner>),
    /// Too many misses or too long a silence. The watchdog stays disarmed
    /// until the next keepalive.
    Resync(ResyncReason),
}

/// Tracks keepalives from the server and escalates silence.
#[derive(Debug)]
pub struct LivenessWatchdog {
    settings: LivenessSettings,
    timer: TimerCell,
    last_keepalive: DateTime<Utc>,
    missed: u32,
    banner: Banner,
}

impl LivenessWatchdog {
    pub fn new(settings: LivenessSettings) -> Self {
        Self {
            settings,
            timer: TimerCell::new(),
            last_keepalive: DateTime::<Utc>::default(),
            missed: 0,
            banner: Banner::connected(),
        }
    }

    /// Begin watching from a clean slate. The start counts as the first
    /// keepalive. Returns the banner if it changed.
    pub fn start<C: Clock + ?Sized>(&mut self, clock: &mut C) -> Option<Banner> {
        self.last_keepalive = clock.now();
        self.missed = 0;
        self.timer.arm(clock, TimerSlot::Liveness, self.settings.window);
        debug!(
            event = "core.liveness.started",
            window = ?self.settings.window,
        );
        self.set_banner(Banner::connected())
    }

    /// Record a keepalive. Returns the banner if it changed.
    pub fn keepalive<C: Clock + ?Sized>(&mut self, clock: &mut C) -> Option<Banner> {
        self.last_keepalive = clock.now();
        if self.missed > 0 {
            info!(
                event = "core.liveness.recovered",
                missed = self.missed,
            );
        }
        self.missed = 0;
        self.timer.arm(clock, TimerSlot::Liveness, self.settings.window);
        self.set_banner(Banner::connected())
    }

    pub fn on_fire<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        handle: TimerHandle,
    ) -> LivenessOutcome {
        if !self.timer.take_fired(handle) {
            return LivenessOutcome::Superseded;
        }

        self.missed += 1;
        let silence = elapsed_between(self.last_keepalive, clock.now());

        if self.missed > self.settings.max_missed {
            warn!(
                event = "core.liveness.resync_forced",
                missed = self.missed,
                silence = ?silence,
            );
            return LivenessOutcome::Resync(ResyncReason::MissedKeepalives {
                count: self.missed,
            });
        }
        if silence >= self.settings.hard_ceiling {
            warn!(
                event = "core.liveness.resync_forced",
                missed = self.missed,
                silence = ?silence,
            );
            return LivenessOutcome::Resync(ResyncReason::Silence {
                elapsed_secs: silence.as_secs(),
            });
        }

        warn!(
            event = "core.liveness.keepalive_missed",
            missed = self.missed,
            last_keepalive = %display_time(self.last_keepalive),
        );
        self.timer.arm(clock, TimerSlot::Liveness, self.settings.window);
        LivenessOutcome::Missed(self.set_banner(Banner::silent_since(self.last_keepalive)))
    }

    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        self.timer.cancel(clock);
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    pub fn last_keepalive(&self) -> DateTime<Utc> {
        self.last_keepalive
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn settings(&self) -> &LivenessSettings {
        &self.settings
    }

    fn set_banner(&mut self, banner: Banner) -> Option<Banner> {
        if self.banner == banner {
            return None;
        }
        self.banner = banner.clone();
        Some(banner)
    }
}
