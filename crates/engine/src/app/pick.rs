use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Bounding sphere standing in for one pickable object.
#[derive(Debug, Clone, PartialEq)]
pub struct PickCandidate<K> {
    pub key: K,
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit<K> {
    pub key: K,
    pub distance: f32,
}

/// Nearest candidate whose bounding sphere the ray enters in front of its origin.
pub fn pick_nearest<K, I>(ray: &Ray, candidates: I) -> Option<PickHit<K>>
where
    I: IntoIterator<Item = PickCandidate<K>>,
{
    let mut nearest: Option<PickHit<K>> = None;
    for candidate in candidates {
        let Some(distance) = ray_sphere(ray, candidate.center, candidate.radius) else {
            continue;
        };
        let closer = nearest
            .as_ref()
            .map_or(true, |current| distance < current.distance);
        if closer {
            nearest = Some(PickHit {
                key: candidate.key,
                distance,
            });
        }
    }
    nearest
}

/// Distance to the first intersection at or after the ray origin.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    if !(radius.is_finite() && radius > 0.0) || ray.direction == Vec3::ZERO {
        return None;
    }
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let near = -b - sqrt_d;
    let far = -b + sqrt_d;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        // Origin is inside the sphere.
        Some(0.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &'static str, z: f32) -> PickCandidate<&'static str> {
        PickCandidate {
            key,
            center: Vec3::new(0.0, 0.0, z),
            radius: 0.5,
        }
    }

    #[test]
    fn nearest_of_overlapping_candidates_wins() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = pick_nearest(&ray, [candidate("far", -9.0), candidate("near", -4.0)])
            .expect("hit");
        assert_eq!(hit.key, "near");
        assert!((hit.distance - 3.5).abs() < 1e-5);
    }

    #[test]
    fn candidates_behind_the_origin_are_missed() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(pick_nearest(&ray, [candidate("behind", 4.0)]).is_none());
    }

    #[test]
    fn off_axis_candidate_is_missed() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let off_axis = PickCandidate {
            key: "side",
            center: Vec3::new(2.0, 0.0, -5.0),
            radius: 0.5,
        };
        assert!(pick_nearest(&ray, [off_axis]).is_none());
    }

    #[test]
    fn origin_inside_sphere_hits_at_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray_sphere(&ray, Vec3::ZERO, 1.0), Some(0.0));
    }
}
