use std::ops::{Add, Index, IndexMut, Mul, Sub};

use nalgebra::{
    ClosedAddAssign, ClosedMulAssign, ClosedSubAssign, DefaultAllocator, DimName, OPoint, OVector,
    Scalar, allocator::Allocator,
};
use num_traits::One;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Point> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        3
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }

    /// Like `map`, but stops at the first failing vertex.
    pub fn try_map<Point2, E, F: FnMut(&Point) -> Result<Point2, E>>(
        &self,
        mut f: F,
    ) -> Result<Triangle<Point2>, E> {
        Ok(Triangle([f(&self[0])?, f(&self[1])?, f(&self[2])?]))
    }
}

impl<Point> From<[Point; 3]> for Triangle<Point> {
    fn from(vertices: [Point; 3]) -> Self {
        Triangle(vertices)
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<Point> IndexMut<usize> for Triangle<Point> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<T: Scalar, D: DimName> Triangle<OPoint<T, D>>
where
    DefaultAllocator: Allocator<D>,
    for<'a> &'a OPoint<T, D>: Sub<Output = OVector<T, D>>,
{
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [OVector<T, D>; 2] {
        [&self.0[1] - &self.0[0], &self.0[2] - &self.0[0]]
    }
}

impl<T: Scalar, D: DimName> Triangle<OPoint<T, D>>
where
    DefaultAllocator: Allocator<D>,
    for<'a> &'a OPoint<T, D>: Sub<Output = OVector<T, D>>,
    T: ClosedAddAssign + ClosedSubAssign + ClosedMulAssign,
{
    /// Returns a normal vector of the triangle, not normalized.
    pub fn normal(&self) -> OVector<T, D> {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }
}

/// Position within a triangle, weights of the vertices are (1 - u - v, u, v).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates<T> {
    pub u: T,
    pub v: T,
}

impl<T> BarycentricCoordinates<T>
where
    T: One + Copy + Sub<Output = T>,
{
    pub fn new(u: T, v: T) -> Self {
        BarycentricCoordinates { u, v }
    }

    /// Weights of the three vertices, in vertex order.
    pub fn weights(&self) -> [T; 3] {
        [T::one() - self.u - self.v, self.u, self.v]
    }

    pub fn interpolate<T2>(&self, a: &T2, b: &T2, c: &T2) -> T2
    where
        for<'a> &'a T2: Mul<T, Output = T2>,
        T2: Add<Output = T2>,
    {
        let [w, u, v] = self.weights();
        a * w + b * u + c * v
    }

    pub fn interpolate_triangle<T2>(&self, triangle: &Triangle<T2>) -> T2
    where
        for<'a> &'a T2: Mul<T, Output = T2>,
        T2: Add<Output = T2>,
    {
        self.interpolate(&triangle[0], &triangle[1], &triangle[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{WorldPoint, WorldVector};
    use assert2::assert;

    #[test]
    fn edges_and_normal() {
        let triangle = Triangle::new(
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(2.0, 1.0, 0.0),
            WorldPoint::new(1.0, 3.0, 0.0),
        );
        let [e1, e2] = triangle.edges();
        assert!(e1 == WorldVector::new(1.0, 0.0, 0.0));
        assert!(e2 == WorldVector::new(0.0, 2.0, 0.0));
        assert!(triangle.normal() == WorldVector::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn try_map_stops_on_error() {
        let triangle = Triangle::new(1u32, 7, 2);
        let mapped: Result<Triangle<u32>, u32> =
            triangle.try_map(|&i| if i < 5 { Ok(i * 10) } else { Err(i) });
        assert!(mapped == Err(7));

        let mapped: Result<Triangle<u32>, u32> = triangle.try_map(|&i| Ok(i + 1));
        assert!(mapped == Ok(Triangle::new(2, 8, 3)));
    }

    #[test]
    fn weights_sum_to_one() {
        let uv = BarycentricCoordinates::new(0.25f32, 0.5);
        assert!(uv.weights() == [0.25, 0.25, 0.5]);
    }

    #[test]
    fn interpolate_corners() {
        let triangle = Triangle::new(
            WorldVector::new(1.0, 0.0, 0.0),
            WorldVector::new(0.0, 1.0, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(BarycentricCoordinates::new(0.0f32, 0.0).interpolate_triangle(&triangle) == triangle[0]);
        assert!(BarycentricCoordinates::new(1.0f32, 0.0).interpolate_triangle(&triangle) == triangle[1]);
        assert!(BarycentricCoordinates::new(0.0f32, 1.0).interpolate_triangle(&triangle) == triangle[2]);
    }
}
