use nalgebra::Vector3;

use super::{FloatType, INVALID_ID, WorldPoint, WorldVector};

/// Single ray together with the best hit found so far.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    pub direction: WorldVector,
    pub tnear: FloatType,
    /// Far bound of the valid ray segment, shrinks to the distance of the closest hit.
    pub tfar: FloatType,

    /// Geometric normal of the hit, not normalized
    pub ng: WorldVector,
    pub u: FloatType,
    pub v: FloatType,
    pub prim_id: u32,
    pub geom_id: u32,
    pub inst_id: u32,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector, tnear: FloatType, tfar: FloatType) -> Ray {
        Ray {
            origin,
            direction,
            tnear,
            tfar,
            ng: WorldVector::zeros(),
            u: 0.0,
            v: 0.0,
            prim_id: INVALID_ID,
            geom_id: INVALID_ID,
            inst_id: INVALID_ID,
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    pub fn has_hit(&self) -> bool {
        self.geom_id != INVALID_ID
    }
}

/// Packet of `K` rays in structure of arrays layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayK<const K: usize> {
    pub origin: Vector3<[FloatType; K]>,
    pub direction: Vector3<[FloatType; K]>,
    pub tnear: [FloatType; K],
    pub tfar: [FloatType; K],

    pub ng: Vector3<[FloatType; K]>,
    pub u: [FloatType; K],
    pub v: [FloatType; K],
    pub prim_id: [u32; K],
    pub geom_id: [u32; K],
    pub inst_id: [u32; K],
}

impl<const K: usize> RayK<K> {
    pub fn from_rays(rays: &[Ray; K]) -> RayK<K> {
        RayK {
            origin: Vector3::new(
                lanes(rays, |r| r.origin.x),
                lanes(rays, |r| r.origin.y),
                lanes(rays, |r| r.origin.z),
            ),
            direction: Vector3::new(
                lanes(rays, |r| r.direction.x),
                lanes(rays, |r| r.direction.y),
                lanes(rays, |r| r.direction.z),
            ),
            tnear: lanes(rays, |r| r.tnear),
            tfar: lanes(rays, |r| r.tfar),
            ng: Vector3::new(
                lanes(rays, |r| r.ng.x),
                lanes(rays, |r| r.ng.y),
                lanes(rays, |r| r.ng.z),
            ),
            u: lanes(rays, |r| r.u),
            v: lanes(rays, |r| r.v),
            prim_id: lanes(rays, |r| r.prim_id),
            geom_id: lanes(rays, |r| r.geom_id),
            inst_id: lanes(rays, |r| r.inst_id),
        }
    }

    /// Extracts a single lane. Panics if `lane >= K`.
    pub fn ray(&self, lane: usize) -> Ray {
        Ray {
            origin: WorldPoint::new(self.origin.x[lane], self.origin.y[lane], self.origin.z[lane]),
            direction: WorldVector::new(
                self.direction.x[lane],
                self.direction.y[lane],
                self.direction.z[lane],
            ),
            tnear: self.tnear[lane],
            tfar: self.tfar[lane],
            ng: WorldVector::new(self.ng.x[lane], self.ng.y[lane], self.ng.z[lane]),
            u: self.u[lane],
            v: self.v[lane],
            prim_id: self.prim_id[lane],
            geom_id: self.geom_id[lane],
            inst_id: self.inst_id[lane],
        }
    }

    pub const fn size() -> usize {
        K
    }
}

fn lanes<T, const K: usize>(rays: &[Ray; K], f: impl Fn(&Ray) -> T) -> [T; K] {
    std::array::from_fn(|lane| f(&rays[lane]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    fn test_ray(i: usize) -> Ray {
        let f = i as f32;
        let mut ray = Ray::new(
            WorldPoint::new(f, 2.0 * f, 3.0 * f),
            WorldVector::new(0.0, 0.0, 1.0),
            0.0,
            100.0 + f,
        );
        ray.prim_id = i as u32;
        ray
    }

    #[test]
    fn new_ray_has_no_hit() {
        let ray = test_ray(0);
        assert!(!ray.has_hit());
        assert!(ray.geom_id == INVALID_ID);
        assert!(ray.ng == WorldVector::zeros());
    }

    #[test]
    fn point_at() {
        let ray = test_ray(1);
        assert!(ray.point_at(2.0) == WorldPoint::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn soa_lanes_round_trip() {
        let rays: [Ray; 4] = std::array::from_fn(test_ray);
        let packet = RayK::from_rays(&rays);
        assert!(packet.tfar == [100.0, 101.0, 102.0, 103.0]);
        assert!(packet.origin.y == [0.0, 2.0, 4.0, 6.0]);
        for (lane, ray) in rays.iter().enumerate() {
            assert!(packet.ray(lane) == *ray);
        }
        assert!(RayK::<4>::size() == 4);
    }
}
