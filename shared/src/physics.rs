use serde::{Deserialize, Serialize};

use crate::track::{Surface, TrackGeometry};
use crate::InputState;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down, matching screen space.
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Returns the unit vector pointing along `heading` radians.
    pub fn from_heading(heading: f32) -> Vector2 {
        Vector2 {
            x: heading.cos(),
            y: heading.sin(),
        }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.distance_squared(&Vector2::default()).sqrt()
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the squared distance to another point.
    pub fn distance_squared(&self, other: &Vector2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    ///Moves `factor` of the way towards `target`.
    pub fn lerp(&self, target: &Vector2, factor: f32) -> Vector2 {
        Vector2 {
            x: self.x + (target.x - self.x) * factor,
            y: self.y + (target.y - self.y) * factor,
        }
    }
}

/// Handling constants for a car. Speeds are in track units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarTuning {
    /// Radians per second while steering.
    pub turn_rate: f32,
    pub acceleration: f32,
    pub brake_deceleration: f32,
    /// Linear drag coefficient per second.
    pub drag: f32,
    /// Multiplier applied to speed on each tick the handbrake is held.
    pub handbrake_damping: f32,
    pub max_speed: f32,
    /// Lower speed bound, negative when reversing.
    pub max_reverse_speed: f32,
    /// Fraction of the speed bounds allowed while on grass.
    pub grass_speed_factor: f32,
}

impl Default for CarTuning {
    fn default() -> Self {
        CarTuning {
            turn_rate: 3.0,
            acceleration: 400.0,
            brake_deceleration: 600.0,
            drag: 0.8,
            handbrake_damping: 0.9,
            max_speed: 480.0,
            max_reverse_speed: -160.0,
            grass_speed_factor: 0.5,
        }
    }
}

/// Kinematic state of one car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CarState {
    pub position: Vector2,
    /// Radians, 0 points along +x.
    pub heading: f32,
    pub speed: f32,
}

impl CarState {
    /// A stationary car at the track's spawn point.
    pub fn at_spawn(track: &TrackGeometry) -> Self {
        CarState {
            position: track.spawn,
            heading: 0.0,
            speed: 0.0,
        }
    }

    /// Advances the car by one timestep of `input`.
    ///
    /// Steering, throttle and brake are applied first, then the handbrake
    /// damping and drag, then speed is clamped to the bounds allowed by the
    /// surface under the car. Moving into a wall cancels the position update
    /// and stops the car.
    pub fn integrate(
        &mut self,
        input: &InputState,
        tuning: &CarTuning,
        track: &TrackGeometry,
        dt: f32,
    ) {
        self.heading += input.steering() * tuning.turn_rate * dt;

        if input.accelerate {
            self.speed += tuning.acceleration * dt;
        }
        if input.brake {
            self.speed -= tuning.brake_deceleration * dt;
        }
        if input.handbrake {
            self.speed *= tuning.handbrake_damping;
        }

        self.speed *= (1.0 - tuning.drag * dt).max(0.0);

        let (min_speed, max_speed) = match track.classify(self.position) {
            Surface::Grass => (
                tuning.max_reverse_speed * tuning.grass_speed_factor,
                tuning.max_speed * tuning.grass_speed_factor,
            ),
            _ => (tuning.max_reverse_speed, tuning.max_speed),
        };
        self.speed = self.speed.clamp(min_speed, max_speed);

        let next = self
            .position
            .add(&Vector2::from_heading(self.heading).scale(self.speed * dt));

        if track.classify(next) == Surface::Wall {
            self.speed = 0.0;
        } else {
            self.position = next;
        }
    }
}

/// Returns the signed shortest rotation from `from` to `to`, in `[-PI, PI]`.
pub fn angle_delta(from: f32, to: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Rect;
    use assert_approx_eq::assert_approx_eq;

    fn open_track() -> TrackGeometry {
        TrackGeometry {
            width: 1000.0,
            height: 1000.0,
            spawn: Vector2::new(500.0, 500.0),
            checkpoints: vec![],
            road: vec![Rect::new(0.0, 0.0, 1000.0, 1000.0)],
            walls: vec![],
        }
    }

    fn no_drag() -> CarTuning {
        CarTuning {
            drag: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_vector_helpers() {
        let v = Vector2::new(3.0, 4.0);
        assert_eq!(v.magnitude(), 5.0);
        assert_eq!(v.scale(2.0), Vector2::new(6.0, 8.0));
        assert_eq!(v.add(&Vector2::new(1.0, 1.0)), Vector2::new(4.0, 5.0));
        assert_eq!(v.distance_squared(&Vector2::default()), 25.0);
        assert_eq!(v.lerp(&Vector2::new(13.0, 4.0), 0.5), Vector2::new(8.0, 4.0));
    }

    #[test]
    fn test_accelerate_moves_along_heading() {
        let track = open_track();
        let mut car = CarState::at_spawn(&track);
        let input = InputState {
            accelerate: true,
            ..Default::default()
        };

        car.integrate(&input, &no_drag(), &track, 0.1);

        assert_approx_eq!(car.speed, 40.0, 1e-4);
        assert_approx_eq!(car.position.x, 504.0, 1e-3);
        assert_approx_eq!(car.position.y, 500.0, 1e-3);
    }

    #[test]
    fn test_steering_turns_at_fixed_rate() {
        let track = open_track();
        let mut car = CarState::at_spawn(&track);
        let tuning = CarTuning::default();
        let input = InputState {
            right: true,
            ..Default::default()
        };

        car.integrate(&input, &tuning, &track, 0.5);

        assert_approx_eq!(car.heading, tuning.turn_rate * 0.5, 1e-5);
    }

    #[test]
    fn test_drag_decays_speed() {
        let track = open_track();
        let mut car = CarState::at_spawn(&track);
        car.speed = 100.0;
        let tuning = CarTuning {
            drag: 0.5,
            ..Default::default()
        };

        car.integrate(&InputState::default(), &tuning, &track, 0.1);
        assert_approx_eq!(car.speed, 95.0, 1e-4);

        // Drag never flips the direction of travel.
        let heavy = CarTuning {
            drag: 100.0,
            ..Default::default()
        };
        car.integrate(&InputState::default(), &heavy, &track, 0.1);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_handbrake_damps_speed() {
        let track = open_track();
        let mut car = CarState::at_spawn(&track);
        car.speed = 200.0;
        let input = InputState {
            handbrake: true,
            ..Default::default()
        };

        car.integrate(&input, &no_drag(), &track, 0.01);

        assert_approx_eq!(car.speed, 180.0, 1e-3);
    }

    #[test]
    fn test_speed_is_clamped() {
        let track = open_track();
        let tuning = no_drag();
        let mut car = CarState::at_spawn(&track);
        car.speed = 10_000.0;
        car.integrate(&InputState::default(), &tuning, &track, 0.001);
        assert_eq!(car.speed, tuning.max_speed);

        car.speed = -10_000.0;
        car.integrate(&InputState::default(), &tuning, &track, 0.001);
        assert_eq!(car.speed, tuning.max_reverse_speed);
    }

    #[test]
    fn test_grass_halves_speed_bounds() {
        let mut track = open_track();
        track.road.clear();
        let tuning = no_drag();
        let mut car = CarState::at_spawn(&track);
        car.speed = tuning.max_speed;

        car.integrate(&InputState::default(), &tuning, &track, 0.001);

        assert_approx_eq!(car.speed, tuning.max_speed * tuning.grass_speed_factor, 1e-3);
    }

    #[test]
    fn test_wall_blocks_movement() {
        let mut track = open_track();
        track.walls.push(Rect::new(505.0, 0.0, 10.0, 1000.0));
        let mut car = CarState::at_spawn(&track);
        car.speed = 100.0;

        car.integrate(&InputState::default(), &no_drag(), &track, 0.1);

        assert_eq!(car.position, track.spawn);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_angle_delta_takes_short_way() {
        use std::f32::consts::PI;
        assert_approx_eq!(angle_delta(0.0, PI / 2.0), PI / 2.0, 1e-5);
        assert_approx_eq!(angle_delta(0.1, 2.0 * PI - 0.1), -0.2, 1e-5);
        assert_approx_eq!(angle_delta(-PI + 0.1, PI - 0.1), -0.2, 1e-5);
    }
}
