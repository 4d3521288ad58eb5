//! Intersection results for single rays and for ray packets.
//!
//! `HitK` is parameterized by its lane layout: `Single` stores flat scalars,
//! `Packet<K>` stores `K` lanes of every field side by side.
//! A hit only reaches the persistent ray state through `copy_to_ray`.

use std::{fmt::Debug, mem::MaybeUninit};

use nalgebra::Vector3;

use super::{FloatType, Ray, RayK, WorldVector};
use crate::util::LaneMask;

/// Marks a missing geometry, primitive or instance.
pub const INVALID_ID: u32 = u32::MAX;

/// Storage layout of one field of a hit record.
pub trait HitLanes {
    const LANES: usize;

    type Float: Copy + PartialEq + Debug + 'static;
    type Id: Copy + PartialEq + Debug + 'static;

    const ZERO_FLOAT: Self::Float;
    const INVALID_ID: Self::Id;
}

/// Scalar layout, one hit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Single;

/// Packet layout, `K` parallel hits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Packet<const K: usize>;

impl HitLanes for Single {
    const LANES: usize = 1;

    type Float = FloatType;
    type Id = u32;

    const ZERO_FLOAT: FloatType = 0.0;
    const INVALID_ID: u32 = INVALID_ID;
}

impl<const K: usize> HitLanes for Packet<K> {
    const LANES: usize = K;

    type Float = [FloatType; K];
    type Id = [u32; K];

    const ZERO_FLOAT: [FloatType; K] = [0.0; K];
    const INVALID_ID: [u32; K] = [INVALID_ID; K];
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitK<W: HitLanes> {
    /// Geometric normal, not normalized
    pub ng: Vector3<W::Float>,
    /// Distance along the ray
    pub t: W::Float,
    pub u: W::Float,
    pub v: W::Float,
    pub prim_id: W::Id,
    pub geom_id: W::Id,
    pub inst_id: W::Id,
}

pub type Hit = HitK<Single>;
pub type Hit4 = HitK<Packet<4>>;
pub type Hit8 = HitK<Packet<8>>;
pub type Hit16 = HitK<Packet<16>>;

impl<W: HitLanes> HitK<W> {
    pub fn new(
        inst_id: W::Id,
        geom_id: W::Id,
        prim_id: W::Id,
        u: W::Float,
        v: W::Float,
        t: W::Float,
        ng: Vector3<W::Float>,
    ) -> Self {
        HitK {
            ng,
            t,
            u,
            v,
            prim_id,
            geom_id,
            inst_id,
        }
    }

    /// Uninitialized storage for a hit, for inner loops that overwrite it whole
    /// before every use.
    pub fn uninit() -> MaybeUninit<Self> {
        MaybeUninit::uninit()
    }

    /// Hit with all distances and coordinates zero and all ids invalid.
    pub fn zeroed() -> Self {
        HitK {
            ng: Vector3::new(W::ZERO_FLOAT, W::ZERO_FLOAT, W::ZERO_FLOAT),
            t: W::ZERO_FLOAT,
            u: W::ZERO_FLOAT,
            v: W::ZERO_FLOAT,
            prim_id: W::INVALID_ID,
            geom_id: W::INVALID_ID,
            inst_id: W::INVALID_ID,
        }
    }

    pub const fn size() -> usize {
        W::LANES
    }
}

impl HitK<Single> {
    /// Writes the hit into the ray. The distance becomes the new `tfar`.
    pub fn copy_to_ray(&self, ray: &mut Ray) {
        ray.ng = self.ng;
        ray.prim_id = self.prim_id;
        ray.geom_id = self.geom_id;
        ray.inst_id = self.inst_id;
        ray.u = self.u;
        ray.v = self.v;
        ray.tfar = self.t;
    }
}

impl std::fmt::Display for HitK<Single> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prim {} geom {} inst {}; u {} v {} t {}; ng ({}, {}, {})",
            self.prim_id,
            self.geom_id,
            self.inst_id,
            self.u,
            self.v,
            self.t,
            self.ng.x,
            self.ng.y,
            self.ng.z
        )
    }
}

impl<const K: usize> std::fmt::Display for HitK<Packet<K>> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prim {:?} geom {:?} inst {:?}; u {:?} v {:?} t {:?}; ng ({:?}, {:?}, {:?})",
            self.prim_id,
            self.geom_id,
            self.inst_id,
            self.u,
            self.v,
            self.t,
            self.ng.x,
            self.ng.y,
            self.ng.z
        )
    }
}

impl<const K: usize> HitK<Packet<K>> {
    /// Writes lanes selected by `mask` into the ray packet.
    /// Lanes not in the mask keep their previous ray state, mask bits at or above `K` are ignored.
    pub fn copy_to_ray(&self, mask: LaneMask, ray: &mut RayK<K>) {
        let mask = mask & LaneMask::first(K);
        store_lanes(mask, &mut ray.ng.x, &self.ng.x);
        store_lanes(mask, &mut ray.ng.y, &self.ng.y);
        store_lanes(mask, &mut ray.ng.z, &self.ng.z);
        store_lanes(mask, &mut ray.prim_id, &self.prim_id);
        store_lanes(mask, &mut ray.geom_id, &self.geom_id);
        store_lanes(mask, &mut ray.inst_id, &self.inst_id);
        store_lanes(mask, &mut ray.u, &self.u);
        store_lanes(mask, &mut ray.v, &self.v);
        store_lanes(mask, &mut ray.tfar, &self.t);
    }

    /// Extracts a single lane. Panics if `lane >= K`.
    pub fn lane(&self, lane: usize) -> Hit {
        Hit {
            ng: WorldVector::new(self.ng.x[lane], self.ng.y[lane], self.ng.z[lane]),
            t: self.t[lane],
            u: self.u[lane],
            v: self.v[lane],
            prim_id: self.prim_id[lane],
            geom_id: self.geom_id[lane],
            inst_id: self.inst_id[lane],
        }
    }

    /// Overwrites a single lane. Panics if `lane >= K`.
    pub fn set_lane(&mut self, lane: usize, hit: &Hit) {
        self.ng.x[lane] = hit.ng.x;
        self.ng.y[lane] = hit.ng.y;
        self.ng.z[lane] = hit.ng.z;
        self.t[lane] = hit.t;
        self.u[lane] = hit.u;
        self.v[lane] = hit.v;
        self.prim_id[lane] = hit.prim_id;
        self.geom_id[lane] = hit.geom_id;
        self.inst_id[lane] = hit.inst_id;
    }
}

#[inline(always)]
fn store_lanes<T: Copy, const K: usize>(mask: LaneMask, dst: &mut [T; K], src: &[T; K]) {
    for lane in mask {
        dst[lane] = src[lane];
    }
}
