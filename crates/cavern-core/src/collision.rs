//! Ray picking against tagged surfaces.
//!
//! Ground following and portal tests query an external scene through the
//! [`SurfacePicker`] trait: a ray with origin, direction and fixed length plus
//! a tag filter goes in, the nearest hit (if any) comes out. [`BoxTerrain`] is
//! a small axis-aligned box scene implementing the trait for simulations and
//! tests.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Surface tag used by ground following.
pub const GROUND_TAG: &str = "ground";

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vector3<f64>,
    /// Maximum corner.
    pub max: Vector3<f64>,
}

impl BoundingBox {
    /// Create a new bounding box; corners are sorted per axis.
    #[must_use]
    pub fn new(a: Vector3<f64>, b: Vector3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Create a bounding box from its center and half-extents.
    #[must_use]
    pub fn from_center_extents(center: Vector3<f64>, half_extents: Vector3<f64>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Check if a point is inside the bounding box.
    #[must_use]
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// A ray of fixed length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Origin point.
    pub origin: Vector3<f64>,
    /// Unit direction.
    pub direction: Vector3<f64>,
    /// Length of the ray.
    pub length: f64,
}

impl Ray {
    /// Create a new ray. A zero direction falls back to straight down.
    #[must_use]
    pub fn new(origin: Vector3<f64>, direction: Vector3<f64>, length: f64) -> Self {
        let direction = direction
            .try_normalize(1e-12)
            .unwrap_or_else(|| Vector3::new(0.0, -1.0, 0.0));
        Self {
            origin,
            direction,
            length,
        }
    }

    /// Get a point along the ray at distance t.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Vector3<f64> {
        self.origin + self.direction * t
    }

    /// Entry and exit distances through a bounding box, if intersected.
    #[must_use]
    pub fn intersect_aabb(&self, aabb: &BoundingBox) -> Option<(f64, f64)> {
        let mut tmin = f64::NEG_INFINITY;
        let mut tmax = f64::INFINITY;

        for axis in 0..3 {
            let d = self.direction[axis];
            let o = self.origin[axis];
            if d.abs() < 1e-12 {
                // Parallel to this slab: must already lie within it
                if o < aabb.min[axis] || o > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let t1 = (aabb.min[axis] - o) * inv;
            let t2 = (aabb.max[axis] - o) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax >= tmin && tmax >= 0.0 {
            Some((tmin.max(0.0), tmax))
        } else {
            None
        }
    }
}

/// Tag filter for pick queries. An empty mask matches every surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickMask {
    tags: Vec<String>,
}

impl PickMask {
    /// Mask matching the given tags.
    #[must_use]
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Mask matching ground-pickable surfaces.
    #[must_use]
    pub fn ground() -> Self {
        Self::new([GROUND_TAG])
    }

    /// Whether a surface with `tag` passes the filter.
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|t| t == tag)
    }
}

/// Nearest hit of a pick query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickHit {
    /// Hit distance as a fraction of the ray length, in `[0, 1]`.
    pub distance: f64,
    /// Name of the surface that was hit.
    pub object: String,
}

/// Raycast service supplied by the scene each tick.
pub trait SurfacePicker {
    /// Nearest surface passing `mask` along `ray`, within its length.
    fn pick(&self, ray: &Ray, mask: &PickMask) -> Option<PickHit>;
}

/// Scene without pickable surfaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSurfaces;

impl SurfacePicker for NoSurfaces {
    fn pick(&self, _ray: &Ray, _mask: &PickMask) -> Option<PickHit> {
        None
    }
}

/// A named, tagged box surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainBox {
    /// Surface name reported on hits.
    pub name: String,
    /// Surface tag matched against pick masks.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Box extent.
    pub bounds: BoundingBox,
}

fn default_tag() -> String {
    GROUND_TAG.to_string()
}

/// Scene made of axis-aligned boxes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxTerrain {
    /// Boxes making up the scene.
    pub boxes: Vec<TerrainBox>,
}

impl BoxTerrain {
    /// Empty terrain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ground box.
    #[must_use]
    pub fn with_box(mut self, name: impl Into<String>, bounds: BoundingBox) -> Self {
        self.boxes.push(TerrainBox {
            name: name.into(),
            tag: default_tag(),
            bounds,
        });
        self
    }

    /// Flat ground slab whose top surface lies at `height`.
    #[must_use]
    pub fn flat(height: f64) -> Self {
        Self::new().with_box(
            "floor",
            BoundingBox::new(
                Vector3::new(-1.0e4, height - 1.0, -1.0e4),
                Vector3::new(1.0e4, height, 1.0e4),
            ),
        )
    }
}

impl SurfacePicker for BoxTerrain {
    fn pick(&self, ray: &Ray, mask: &PickMask) -> Option<PickHit> {
        if ray.length <= 0.0 {
            return None;
        }
        self.boxes
            .iter()
            .filter(|b| mask.matches(&b.tag))
            .filter_map(|b| ray.intersect_aabb(&b.bounds).map(|(t, _)| (t, b)))
            .filter(|(t, _)| *t <= ray.length)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, b)| PickHit {
                distance: t / ray.length,
                object: b.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(origin: Vector3<f64>) -> Ray {
        Ray::new(origin, Vector3::new(0.0, -1.0, 0.0), 100.0)
    }

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(-1.0, -1.0, -1.0));

        assert!(bb.contains(&Vector3::zeros()));
        assert!(!bb.contains(&Vector3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = BoundingBox::from_center_extents(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(-5.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0), 10.0);
        let (tmin, tmax) = ray.intersect_aabb(&aabb).expect("ray should hit");
        assert!((tmin - 4.0).abs() < 1e-9);
        assert!((tmax - 6.0).abs() < 1e-9);

        let away = Ray::new(Vector3::new(-5.0, 0.0, 0.0), Vector3::new(-1.0, 0.0, 0.0), 10.0);
        assert!(away.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn test_ray_point_at() {
        let ray = down(Vector3::new(0.0, 10.0, 0.0));
        assert!((ray.point_at(4.0) - Vector3::new(0.0, 6.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_flat_terrain_distance_is_fraction_of_length() {
        let terrain = BoxTerrain::flat(0.0);
        let hit = terrain
            .pick(&down(Vector3::new(3.0, 2.0, -4.0)), &PickMask::ground())
            .expect("floor below");

        assert!((hit.distance - 0.02).abs() < 1e-12);
        assert_eq!(hit.object, "floor");
    }

    #[test]
    fn test_pick_respects_mask_and_length() {
        let terrain = BoxTerrain::flat(0.0);

        assert!(terrain
            .pick(&down(Vector3::new(0.0, 2.0, 0.0)), &PickMask::new(["portal"]))
            .is_none());

        let short = Ray::new(Vector3::new(0.0, 2.0, 0.0), Vector3::new(0.0, -1.0, 0.0), 1.0);
        assert!(terrain.pick(&short, &PickMask::ground()).is_none());
    }

    #[test]
    fn test_pick_returns_nearest() {
        let terrain = BoxTerrain::flat(0.0).with_box(
            "step",
            BoundingBox::new(Vector3::new(-1.0, 0.0, -1.0), Vector3::new(1.0, 0.5, 1.0)),
        );
        let hit = terrain
            .pick(&down(Vector3::new(0.0, 2.0, 0.0)), &PickMask::ground())
            .expect("step below");
        assert_eq!(hit.object, "step");
        assert!((hit.distance * 100.0 - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_surfaces() {
        assert!(NoSurfaces.pick(&down(Vector3::zeros()), &PickMask::default()).is_none());
    }
}
