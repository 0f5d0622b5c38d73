//! Overlap queries for sensor colliders.

use crate::PhysicsWorld;
use rapier3d::prelude::*;

impl PhysicsWorld {
    /// Bodies whose colliders currently intersect `sensor`, each listed once,
    /// ordered by handle. Empty for missing or non-sensor colliders.
    pub fn overlapping_bodies(&self, sensor: ColliderHandle) -> Vec<RigidBodyHandle> {
        match self.collider_set.get(sensor) {
            Some(collider) if collider.is_sensor() => {}
            _ => return Vec::new(),
        }

        let mut bodies: Vec<RigidBodyHandle> = self
            .narrow_phase
            .intersection_pairs_with(sensor)
            .filter(|(_, _, intersecting)| *intersecting)
            .filter_map(|(c1, c2, _)| {
                let other = if c1 == sensor { c2 } else { c1 };
                self.collider_parent(other)
            })
            .collect();

        bodies.sort_by_key(|handle| handle.into_raw_parts());
        bodies.dedup();
        bodies
    }
}

#[cfg(test)]
mod tests {
    use crate::{BodyDesc, PhysicsWorld, Shape};
    use engine_core::Vec3;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn sensor_reports_each_overlapping_body_once() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (_, sensor) = world.add_body(&BodyDesc::sensor(
            Shape::Cuboid { half_extents: Vec3::splat(2.0) },
            Vec3::ZERO,
        ));
        let (inside, _) = world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::ZERO, 1.0));
        let (also_inside, _) = world.add_body(&BodyDesc::dynamic(
            Shape::Ball { radius: 0.5 },
            Vec3::new(1.0, 0.0, 0.0),
            1.0,
        ));
        let (outside, _) = world.add_body(&BodyDesc::dynamic(
            Shape::Ball { radius: 0.5 },
            Vec3::new(10.0, 0.0, 0.0),
            1.0,
        ));

        world.step(DT);
        let overlapping = world.overlapping_bodies(sensor);
        assert_eq!(overlapping.len(), 2);
        assert!(overlapping.contains(&inside));
        assert!(overlapping.contains(&also_inside));
        assert!(!overlapping.contains(&outside));
    }

    #[test]
    fn sensor_does_not_block_bodies() {
        let mut world = PhysicsWorld::new();
        let (_, sensor) = world.add_body(&BodyDesc::sensor(
            Shape::Cuboid { half_extents: Vec3::new(5.0, 0.5, 5.0) },
            Vec3::ZERO,
        ));
        let (ball, _) = world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::Y * 2.0, 1.0));
        for _ in 0..90 {
            world.step(DT);
        }
        assert!(world.body_transform(ball).unwrap().position.y < -1.0);
        assert!(world.overlapping_bodies(sensor).is_empty());
    }

    #[test]
    fn solid_colliders_are_not_sensors() {
        let mut world = PhysicsWorld::new();
        let (_, solid) = world.add_body(&BodyDesc::fixed(Shape::Ball { radius: 1.0 }, Vec3::ZERO));
        world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::ZERO, 1.0));
        world.step(DT);
        assert!(world.overlapping_bodies(solid).is_empty());
    }
}
