//! Line following and intersection maneuvers.
//!
//! The [`MotionController`] reads four line sensors every tick, classifies
//! the reading and drives the motors. At an intersection it first executes
//! the pending [`TurnSignal`] as a timed maneuver, then re-reads the sensors
//! and steers on the fresh reading.
//!
//! Hardware access sits behind [`LineSensorArray`] and [`MotorActuator`].

use std::sync::Arc;
use std::time::Duration;

use gridbot_types::TurnSignal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{debug, info};

use crate::config::MotionConfig;
use crate::context::AgentContext;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// One reading of the four line sensors, left to right.
///
/// `true` means the sensor sees the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SensorReading {
    /// Outermost left sensor.
    pub left_outer: bool,
    /// Inner left sensor.
    pub left_inner: bool,
    /// Inner right sensor.
    pub right_inner: bool,
    /// Outermost right sensor.
    pub right_outer: bool,
}

impl SensorReading {
    /// Build a reading from raw active-low levels (`false` = line seen),
    /// ordered left-outer, left-inner, right-inner, right-outer.
    pub const fn from_active_low(levels: [bool; 4]) -> Self {
        let [lo, li, ri, ro] = levels;
        Self {
            left_outer: !lo,
            left_inner: !li,
            right_inner: !ri,
            right_outer: !ro,
        }
    }

    /// Whether the reading marks a crossing line.
    pub const fn is_intersection(self) -> bool {
        let Self {
            left_outer: lo,
            left_inner: li,
            right_inner: ri,
            right_outer: ro,
        } = self;
        (lo && li && ri && ro)
            || ((lo || li) && ro)
            || (lo && (ri || ro))
            || (ri && ro)
            || (lo && li)
    }

    /// Steering for an ordinary stretch of line.
    pub const fn line_action(self) -> LineAction {
        let Self {
            left_outer: lo,
            left_inner: li,
            right_inner: ri,
            right_outer: ro,
        } = self;
        let nothing = !lo && !li && !ri && !ro;
        if (li && ri) || nothing {
            LineAction::Forward
        } else if lo {
            LineAction::SlightLeft
        } else if ro {
            LineAction::SlightRight
        } else if li {
            LineAction::SlightLeft
        } else if ri {
            LineAction::SlightRight
        } else {
            LineAction::Forward
        }
    }
}

/// Steering outcome of a line reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineAction {
    /// Both sides at cruise speed.
    Forward,
    /// Short correction toward the left.
    SlightLeft,
    /// Short correction toward the right.
    SlightRight,
}

// ---------------------------------------------------------------------------
// Motors
// ---------------------------------------------------------------------------

/// Rotation direction of one side's wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelDirection {
    /// Backwards.
    Reverse,
    /// Forwards.
    Forward,
}

impl WheelDirection {
    /// Direction code understood by the motor driver (0 reverse, 1 forward).
    pub const fn code(self) -> u8 {
        match self {
            Self::Reverse => 0,
            Self::Forward => 1,
        }
    }
}

/// A complete motor instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorCommand {
    /// Left side direction.
    pub left_direction: WheelDirection,
    /// Left side speed, 0-100.
    pub left_speed: u8,
    /// Right side direction.
    pub right_direction: WheelDirection,
    /// Right side speed, 0-100.
    pub right_speed: u8,
}

impl MotorCommand {
    /// Both sides stopped.
    pub const STOP: Self = Self {
        left_direction: WheelDirection::Reverse,
        left_speed: 0,
        right_direction: WheelDirection::Reverse,
        right_speed: 0,
    };

    /// Both sides forward at `speed`.
    pub const fn forward(speed: u8) -> Self {
        Self {
            left_direction: WheelDirection::Forward,
            left_speed: speed,
            right_direction: WheelDirection::Forward,
            right_speed: speed,
        }
    }

    /// Rotate counter-clockwise in place at `speed`.
    pub const fn rotate_left(speed: u8) -> Self {
        Self {
            left_direction: WheelDirection::Reverse,
            left_speed: speed,
            right_direction: WheelDirection::Forward,
            right_speed: speed,
        }
    }

    /// Rotate clockwise in place at `speed`.
    pub const fn rotate_right(speed: u8) -> Self {
        Self {
            left_direction: WheelDirection::Forward,
            left_speed: speed,
            right_direction: WheelDirection::Reverse,
            right_speed: speed,
        }
    }

    /// Whether both speeds are zero.
    pub const fn is_stop(self) -> bool {
        self.left_speed == 0 && self.right_speed == 0
    }
}

/// The four line sensors.
pub trait LineSensorArray: Send {
    /// Take one reading.
    fn read(&mut self) -> SensorReading;
}

/// The drive motors.
pub trait MotorActuator: Send {
    /// Apply `command` until the next one.
    fn drive(&mut self, command: MotorCommand);

    /// Stop both sides.
    fn stop(&mut self) {
        self.drive(MotorCommand::STOP);
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// What one controller tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// The turn executed, if the tick started on an intersection.
    pub intersection: Option<TurnSignal>,
    /// Steering applied after any maneuver.
    pub action: LineAction,
}

/// Fixed-rate line-following loop.
#[derive(Debug)]
pub struct MotionController<S, M> {
    sensors: S,
    motors: M,
    context: Arc<AgentContext>,
    config: MotionConfig,
}

impl<S, M> MotionController<S, M>
where
    S: LineSensorArray,
    M: MotorActuator,
{
    /// Create a controller over the given hardware.
    pub const fn new(sensors: S, motors: M, context: Arc<AgentContext>, config: MotionConfig) -> Self {
        Self {
            sensors,
            motors,
            context,
            config,
        }
    }

    /// Run one sense-classify-act step.
    pub async fn tick(&mut self) -> TickReport {
        let mut reading = self.sensors.read();
        let mut intersection = None;

        if reading.is_intersection() {
            let signal = self.context.heading().take_pending();
            debug!(?reading, %signal, "intersection");
            self.execute(signal).await;
            intersection = Some(signal);
            reading = self.sensors.read();
        }

        let action = reading.line_action();
        match action {
            LineAction::Forward => {
                self.motors.drive(MotorCommand::forward(self.config.cruise_speed));
            }
            LineAction::SlightLeft => {
                self.motors
                    .drive(MotorCommand::rotate_left(self.config.steer_speed));
                sleep(millis(self.config.steer_ms)).await;
            }
            LineAction::SlightRight => {
                self.motors
                    .drive(MotorCommand::rotate_right(self.config.steer_speed));
                sleep(millis(self.config.steer_ms)).await;
            }
        }

        TickReport {
            intersection,
            action,
        }
    }

    /// Execute the maneuver for `signal`.
    async fn execute(&mut self, signal: TurnSignal) {
        let cfg = self.config;
        let rotate = match signal {
            TurnSignal::NoTurn => return,
            TurnSignal::UTurn => {
                self.rotate(MotorCommand::rotate_right(cfg.turn_speed), cfg.u_turn_rotate_ms)
                    .await;
                return;
            }
            TurnSignal::TurnLeft => MotorCommand::rotate_left(cfg.turn_speed),
            TurnSignal::TurnRight => MotorCommand::rotate_right(cfg.turn_speed),
        };
        self.rotate(rotate, cfg.turn_rotate_ms).await;
        self.motors.drive(MotorCommand::forward(cfg.advance_speed));
        sleep(millis(cfg.advance_ms)).await;
        self.rotate(rotate, cfg.turn_rotate_ms).await;
    }

    /// Rotate for `duration_ms`, stop, then let the chassis settle.
    async fn rotate(&mut self, command: MotorCommand, duration_ms: u64) {
        self.motors.drive(command);
        sleep(millis(duration_ms)).await;
        self.motors.stop();
        sleep(millis(self.config.settle_ms)).await;
    }

    /// Tick until `shutdown` fires, then stop the motors.
    ///
    /// Returns the number of completed ticks.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        info!(
            tick_interval_ms = self.config.tick_interval_ms,
            "motion loop starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = async {
                    interval.tick().await;
                    self.tick().await
                } => {
                    ticks = ticks.saturating_add(1);
                }
            }
        }

        self.motors.stop();
        info!(ticks, "motion loop stopped, motors halted");
        ticks
    }
}

const fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
