//! Binary space partitioning tree for polygon CSG, after the csg.js scheme.
//!
//! Every node splits space with the plane of its first polygon. Polygons
//! coplanar with the plane stay in the node; the rest go to the front or back
//! subtree.

use super::{
    plane::Plane,
    polygon::{Polygon, Split},
};

#[derive(Default)]
pub(super) struct BspNode {
    plane: Option<Plane>,
    polygons: Vec<Polygon>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
}

impl BspNode {
    pub(super) fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = BspNode::default();
        node.build(polygons);
        node
    }

    /// Insert polygons into the tree, growing new nodes as needed.
    pub(super) fn build(&mut self, polygons: Vec<Polygon>) {
        let Some(first) = polygons.first() else {
            return;
        };
        let plane = *self.plane.get_or_insert(first.plane);
        let mut out = Split::default();
        for poly in polygons {
            poly.split(&plane, &mut out);
        }
        self.polygons.append(&mut out.coplanar_front);
        self.polygons.append(&mut out.coplanar_back);
        if !out.front.is_empty() {
            self.front
                .get_or_insert_with(Default::default)
                .build(out.front);
        }
        if !out.back.is_empty() {
            self.back
                .get_or_insert_with(Default::default)
                .build(out.back);
        }
    }

    /// Turn the solid inside out.
    pub(super) fn invert(&mut self) {
        for poly in &mut self.polygons {
            poly.flip();
        }
        if let Some(plane) = self.plane.as_mut() {
            plane.flip();
        }
        if let Some(front) = self.front.as_mut() {
            front.invert();
        }
        if let Some(back) = self.back.as_mut() {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` inside the solid of this tree.
    pub(super) fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };
        let mut out = Split::default();
        for poly in polygons {
            poly.split(&plane, &mut out);
        }
        let Split {
            coplanar_front,
            coplanar_back,
            mut front,
            mut back,
        } = out;
        front.extend(coplanar_front);
        back.extend(coplanar_back);
        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(node) => node.clip_polygons(back),
            None => Vec::new(),
        };
        front.extend(back);
        front
    }

    /// Remove the parts of this tree's polygons inside the solid of `other`.
    pub(super) fn clip_to(&mut self, other: &BspNode) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = self.front.as_mut() {
            front.clip_to(other);
        }
        if let Some(back) = self.back.as_mut() {
            back.clip_to(other);
        }
    }

    pub(super) fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<Polygon>) {
        out.extend(self.polygons.iter().cloned());
        if let Some(front) = &self.front {
            front.collect(out);
        }
        if let Some(back) = &self.back {
            back.collect(out);
        }
    }
}

pub(super) fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspNode::new(a);
    let mut b = BspNode::new(b);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}

pub(super) fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspNode::new(a);
    let mut b = BspNode::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

pub(super) fn intersect(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspNode::new(a);
    let mut b = BspNode::new(b);
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}
