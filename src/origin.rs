//! Floating world origin.
//!
//! Projected RD New coordinates reach ~480 km, where an `f32` resolves only
//! 1/32 m. The scene is therefore rendered relative to a [`WorldOrigin`] kept
//! in `f64`; the player rig stays near world zero and anything pinned to the
//! map carries a [`GeoAnchor`] that is re-placed whenever the origin moves.

use bevy::math::DVec2;
use bevy::prelude::*;

/// Projected coordinates (easting, northing) of world-space `x = 0, z = 0`.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct WorldOrigin(pub DVec2);

impl WorldOrigin {
    /// Origin at the given easting and northing.
    pub fn new(easting: f64, northing: f64) -> Self {
        Self(DVec2::new(easting, northing))
    }

    /// Projected easting and northing of a world-space point.
    pub fn to_projected(self, local: Vec3) -> DVec2 {
        self.0 + DVec2::new(local.x as f64, local.z as f64)
    }

    /// World-space position of an anchored point.
    pub fn to_local(self, anchor: &GeoAnchor) -> Vec3 {
        let offset = anchor.position - self.0;
        Vec3::new(offset.x as f32, anchor.height, offset.y as f32)
    }

    /// Moves the origin by a world-space XZ offset.
    pub fn shift(&mut self, offset: Vec2) {
        self.0 += offset.as_dvec2();
    }
}

/// Pins an entity to projected coordinates. Its `Transform` translation is
/// derived from the [`WorldOrigin`].
#[derive(Component, Clone, Copy, Debug, PartialEq, Reflect)]
pub struct GeoAnchor {
    /// Easting and northing in meters.
    pub position: DVec2,
    /// World-space height.
    pub height: f32,
}

impl GeoAnchor {
    /// Anchor at the given easting, world height and northing.
    pub fn new(easting: f64, height: f32, northing: f64) -> Self {
        Self {
            position: DVec2::new(easting, northing),
            height,
        }
    }
}

/// Re-places every anchored entity after the origin moved.
pub fn place_anchored(
    origin: Res<WorldOrigin>,
    mut anchored: Query<(&GeoAnchor, &mut Transform)>,
) {
    if !origin.is_changed() {
        return;
    }
    for (anchor, mut tf) in &mut anchored {
        tf.translation = origin.to_local(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── conversions ────────────────────────────────────────────────

    #[test]
    fn small_steps_survive_far_from_zero() {
        let origin = WorldOrigin::new(107_627.0, 479_962.0);
        let p = origin.to_projected(Vec3::new(0.0, 0.0, -0.01));
        assert!((p.y - 479_961.99).abs() < 1e-6);
    }

    #[test]
    fn anchor_lands_relative_to_origin() {
        let origin = WorldOrigin::new(107_627.0, 479_962.0);
        let anchor = GeoAnchor::new(107_750.5, 3.0, 479_837.5);
        assert_eq!(origin.to_local(&anchor), Vec3::new(123.5, 3.0, -124.5));
    }

    #[test]
    fn shift_keeps_projected_position() {
        let mut origin = WorldOrigin::new(1_000.0, 2_000.0);
        let local = Vec3::new(12.25, 0.0, -3.5);
        let before = origin.to_projected(local);
        origin.shift(Vec2::new(local.x, local.z));
        assert_eq!(origin.to_projected(Vec3::ZERO), before);
    }

    // ── placement ──────────────────────────────────────────────────

    #[test]
    fn anchored_entities_follow_origin_shift() {
        let mut app = App::new();
        app.insert_resource(WorldOrigin::new(100.0, 100.0))
            .add_systems(Update, place_anchored);
        let e = app
            .world_mut()
            .spawn((GeoAnchor::new(110.0, 1.0, 90.0), Transform::default()))
            .id();
        app.update();
        assert_eq!(
            app.world().get::<Transform>(e).unwrap().translation,
            Vec3::new(10.0, 1.0, -10.0)
        );

        app.world_mut()
            .resource_mut::<WorldOrigin>()
            .shift(Vec2::new(10.0, -10.0));
        app.update();
        assert_eq!(
            app.world().get::<Transform>(e).unwrap().translation,
            Vec3::new(0.0, 1.0, 0.0)
        );
    }
}
