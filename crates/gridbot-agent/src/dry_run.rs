//! Bench adapters for running the agent without the robot.
//!
//! [`NoLineSensors`] reports an empty floor, which keeps the motion loop
//! driving straight ahead. [`LoggingActuator`] logs each motor command
//! instead of driving wheels.

use gridbot_core::motion::{LineSensorArray, MotorActuator, MotorCommand, SensorReading};
use tracing::{debug, info};

/// Pin levels of the active-low sensor array over bare floor.
const BARE_FLOOR_LEVELS: [bool; 4] = [true; 4];

/// Sensor stub that never sees a line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLineSensors;

impl LineSensorArray for NoLineSensors {
    fn read(&mut self) -> SensorReading {
        SensorReading::from_active_low(BARE_FLOOR_LEVELS)
    }
}

/// Actuator that logs commands.
///
/// Repeats of the previous command are counted but logged only at `debug`,
/// so a straight run does not flood the log.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    last: Option<MotorCommand>,
    commands: u64,
}

impl LoggingActuator {
    /// Create an actuator that has not been driven yet.
    pub const fn new() -> Self {
        Self {
            last: None,
            commands: 0,
        }
    }
}

impl MotorActuator for LoggingActuator {
    fn drive(&mut self, command: MotorCommand) {
        self.commands = self.commands.saturating_add(1);
        if self.last == Some(command) {
            debug!(?command, "motor command repeated");
        } else if command.is_stop() {
            info!("motors stopped");
        } else {
            info!(
                left_direction = command.left_direction.code(),
                left_speed = command.left_speed,
                right_direction = command.right_direction.code(),
                right_speed = command.right_speed,
                "motor command"
            );
        }
        self.last = Some(command);
    }
}

impl Drop for LoggingActuator {
    fn drop(&mut self) {
        info!(commands = self.commands, "dry-run actuator released");
    }
}
