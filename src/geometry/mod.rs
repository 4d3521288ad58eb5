mod hit;
mod ray;
mod triangle;

pub use hit::{Hit, Hit4, Hit8, Hit16, HitK, HitLanes, INVALID_ID, Packet, Single};
pub use ray::{Ray, RayK};
pub use triangle::{BarycentricCoordinates, Triangle};

pub type FloatType = f32;
pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
