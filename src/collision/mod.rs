//! Signed-distance collision queries against an externally owned environment
//!
//! The engine is a thin adapter: it pairs the robot's registered collision
//! shapes with world poses computed from the robot state and forwards the
//! narrow-phase work to a [`Broadphase`] implementation. Shapes and poses
//! use the parry types directly (`SharedShape`, `Isometry3`).

use nalgebra::{Isometry3, Point3};
use ordered_float::OrderedFloat;
use parry3d_f64::query;
use parry3d_f64::shape::SharedShape;
use std::sync::Arc;
use tracing::warn;

use crate::common::{constants, DynamicsError, DynamicsResult};

/// Result of one signed-distance query.
///
/// `distance < 0` means the shapes interpenetrate. The witness points are
/// expressed in the world frame: `p_env` on the environment, `p_robot` on
/// the robot shape. Recomputed per query, never cached.
#[derive(Debug, Clone)]
pub struct CollisionOut {
    pub distance: f64,
    pub p_env: Point3<f64>,
    pub p_robot: Point3<f64>,
}

impl CollisionOut {
    /// Sentinel result meaning "infinitely far from everything"
    pub fn far() -> Self {
        CollisionOut {
            distance: constants::FREE_SPACE_DISTANCE,
            p_env: Point3::origin(),
            p_robot: Point3::origin(),
        }
    }
}

/// Contract of the externally owned collision structure.
///
/// Implementations answer queries for one robot shape at one world pose;
/// how they index their own obstacles (flat list, BVH, ...) is their
/// concern. Thread safety of the structure itself is the implementor's
/// responsibility, hence the `Send + Sync` bound.
pub trait Broadphase: Send + Sync {
    /// True if `shape` at `pose` touches any obstacle
    fn collide(&self, shape: &SharedShape, pose: &Isometry3<f64>) -> bool;

    /// Signed distance from `shape` at `pose` to the nearest obstacle
    fn distance(&self, shape: &SharedShape, pose: &Isometry3<f64>) -> CollisionOut;
}

/// A flat list of static obstacles answering queries with parry
/// narrow-phase calls.
#[derive(Default)]
pub struct StaticEnvironment {
    obstacles: Vec<(SharedShape, Isometry3<f64>)>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        StaticEnvironment {
            obstacles: Vec::new(),
        }
    }

    pub fn add_obstacle(&mut self, shape: SharedShape, pose: Isometry3<f64>) {
        self.obstacles.push((shape, pose));
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl Broadphase for StaticEnvironment {
    fn collide(&self, shape: &SharedShape, pose: &Isometry3<f64>) -> bool {
        self.obstacles.iter().any(|(obs, obs_pose)| {
            match query::intersection_test(obs_pose, &**obs, pose, &**shape) {
                Ok(hit) => hit,
                Err(_) => {
                    warn!("unsupported shape pair in collision test, ignoring obstacle");
                    false
                }
            }
        })
    }

    fn distance(&self, shape: &SharedShape, pose: &Isometry3<f64>) -> CollisionOut {
        self.obstacles
            .iter()
            .filter_map(|(obs, obs_pose)| {
                match query::contact(obs_pose, &**obs, pose, &**shape, constants::CONTACT_PREDICTION)
                {
                    Ok(Some(contact)) => Some(CollisionOut {
                        distance: contact.dist,
                        p_env: contact.point1,
                        p_robot: contact.point2,
                    }),
                    Ok(None) => Some(CollisionOut::far()),
                    Err(_) => {
                        warn!("unsupported shape pair in distance query, ignoring obstacle");
                        None
                    }
                }
            })
            .min_by_key(|out| OrderedFloat(out.distance))
            .unwrap_or_else(CollisionOut::far)
    }
}

/// Registered robot collision shapes plus an optional environment handle.
///
/// The engine does not know how to place shapes in the world; callers
/// supply one pose per registered shape (in registration order), usually
/// computed by the robot's pose function from its state.
pub struct CollisionEngine {
    shapes: Vec<SharedShape>,
    env: Option<Arc<dyn Broadphase>>,
}

impl CollisionEngine {
    pub fn new() -> Self {
        CollisionEngine {
            shapes: Vec::new(),
            env: None,
        }
    }

    /// Add a robot collision shape; poses passed to queries must follow
    /// registration order.
    pub fn register_shape(&mut self, shape: SharedShape) {
        self.shapes.push(shape);
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn set_environment(&mut self, env: Arc<dyn Broadphase>) {
        self.env = Some(env);
    }

    pub fn has_environment(&self) -> bool {
        self.env.is_some()
    }

    fn check_poses(&self, poses: &[Isometry3<f64>]) -> DynamicsResult<()> {
        if poses.len() != self.shapes.len() {
            return Err(DynamicsError::precondition(format!(
                "got {} poses for {} registered shapes",
                poses.len(),
                self.shapes.len()
            )));
        }
        Ok(())
    }

    /// True when no registered shape collides with the environment.
    /// Short-circuits on the first positive collision. Requires an
    /// environment handle.
    pub fn check(&self, poses: &[Isometry3<f64>]) -> DynamicsResult<bool> {
        self.check_poses(poses)?;
        let env = self
            .env
            .as_ref()
            .ok_or_else(|| DynamicsError::precondition("collision environment not set"))?;
        for (shape, pose) in self.shapes.iter().zip(poses) {
            if env.collide(shape, pose) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Minimum signed distance across all registered shapes; ties go to
    /// the earliest-registered shape. Without an environment the query
    /// degrades to the far sentinel instead of failing.
    pub fn distance(&self, poses: &[Isometry3<f64>]) -> DynamicsResult<CollisionOut> {
        self.check_poses(poses)?;
        let env = match &self.env {
            Some(env) => env,
            None => {
                warn!("collision distance queried with no environment set");
                return Ok(CollisionOut::far());
            }
        };
        let mut best = CollisionOut::far();
        for (shape, pose) in self.shapes.iter().zip(poses) {
            let out = env.distance(shape, pose);
            if out.distance < best.distance {
                best = out;
            }
        }
        Ok(best)
    }
}

impl Default for CollisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn unit_ball_world() -> Arc<StaticEnvironment> {
        let mut env = StaticEnvironment::new();
        env.add_obstacle(SharedShape::ball(1.0), Isometry3::identity());
        Arc::new(env)
    }

    fn engine_with_ball(radius: f64) -> CollisionEngine {
        let mut engine = CollisionEngine::new();
        engine.register_shape(SharedShape::ball(radius));
        engine
    }

    fn translation(x: f64, y: f64, z: f64) -> Isometry3<f64> {
        Isometry3::translation(x, y, z)
    }

    #[test]
    fn test_distance_without_environment_is_sentinel() {
        let engine = engine_with_ball(0.5);
        let out = engine.distance(&[translation(0.0, 0.0, 0.0)]).unwrap();
        assert_eq!(out.distance, crate::common::constants::FREE_SPACE_DISTANCE);

        let out = engine.distance(&[translation(100.0, -3.0, 7.0)]).unwrap();
        assert_eq!(out.distance, crate::common::constants::FREE_SPACE_DISTANCE);
    }

    #[test]
    fn test_check_without_environment_is_precondition_violation() {
        let engine = engine_with_ball(0.5);
        assert!(engine.check(&[Isometry3::identity()]).is_err());
    }

    #[test]
    fn test_pose_count_mismatch_is_rejected() {
        let mut engine = engine_with_ball(0.5);
        engine.set_environment(unit_ball_world());
        assert!(engine.distance(&[]).is_err());
        assert!(engine
            .check(&[Isometry3::identity(), Isometry3::identity()])
            .is_err());
    }

    #[test]
    fn test_sphere_sphere_distance() {
        let mut engine = engine_with_ball(0.5);
        engine.set_environment(unit_ball_world());

        // centers 5 apart, radii 1 and 0.5
        let out = engine.distance(&[translation(3.0, 4.0, 0.0)]).unwrap();
        assert!((out.distance - 3.5).abs() < 1e-9);

        // witness points sit on the segment between centers
        let dir = Vector3::new(0.6, 0.8, 0.0);
        assert!((out.p_env.coords - dir).norm() < 1e-6);
        assert!((out.p_robot.coords - (Vector3::new(3.0, 4.0, 0.0) - 0.5 * dir)).norm() < 1e-6);
    }

    #[test]
    fn test_penetration_is_negative() {
        let mut engine = engine_with_ball(0.5);
        engine.set_environment(unit_ball_world());
        let out = engine.distance(&[translation(1.0, 0.0, 0.0)]).unwrap();
        assert!((out.distance + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_check_reports_collision() {
        let mut engine = engine_with_ball(0.5);
        engine.set_environment(unit_ball_world());
        assert!(!engine.check(&[translation(1.0, 0.0, 0.0)]).unwrap());
        assert!(engine.check(&[translation(3.0, 0.0, 0.0)]).unwrap());
    }

    #[test]
    fn test_minimum_across_shapes_wins() {
        let mut engine = CollisionEngine::new();
        engine.register_shape(SharedShape::ball(0.5));
        engine.register_shape(SharedShape::ball(0.5));
        engine.set_environment(unit_ball_world());

        let poses = [translation(10.0, 0.0, 0.0), translation(2.0, 0.0, 0.0)];
        let out = engine.distance(&poses).unwrap();
        assert!((out.distance - 0.5).abs() < 1e-9);
    }
}
