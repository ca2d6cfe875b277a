use super::{BBox, Point3, Vec3};

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: BBox,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    const fn leaf(bbox: BBox, start: u32, count: u32) -> Self {
        Self {
            bbox,
            left: u32::MAX,
            right: u32::MAX,
            start,
            count,
        }
    }

    const fn inner(bbox: BBox, left: u32, right: u32) -> Self {
        Self {
            bbox,
            left,
            right,
            start: 0,
            count: 0,
        }
    }

    const fn is_leaf(self) -> bool {
        self.count != 0
    }
}

/// Ray with precomputed reciprocal direction for repeated slab tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ray {
    pub origin: Point3,
    pub dir: Vec3,
    inv_dir: Vec3,
}

impl Ray {
    pub(crate) fn new(origin: Point3, dir: Vec3) -> Self {
        let inv = |d: f64| if d == 0.0 { f64::INFINITY.copysign(d) } else { 1.0 / d };
        Self {
            origin,
            dir,
            inv_dir: Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z)),
        }
    }

    /// Entry parameter of the ray into `bbox` clipped to `[t_min, t_max]`.
    fn slab_entry(&self, bbox: BBox, t_min: f64, t_max: f64) -> Option<f64> {
        let mut lo = t_min;
        let mut hi = t_max;
        let axes = [
            (self.origin.x, self.inv_dir.x, bbox.min.x, bbox.max.x),
            (self.origin.y, self.inv_dir.y, bbox.min.y, bbox.max.y),
            (self.origin.z, self.inv_dir.z, bbox.min.z, bbox.max.z),
        ];
        for (o, inv, min, max) in axes {
            if inv.is_infinite() {
                if o < min || o > max {
                    return None;
                }
                continue;
            }
            let mut t0 = (min - o) * inv;
            let mut t1 = (max - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            lo = lo.max(t0);
            hi = hi.min(t1);
            if hi < lo {
                return None;
            }
        }
        Some(lo)
    }
}

/// Bounding volume hierarchy over primitive boxes, built once per mesh.
#[derive(Debug, Clone)]
pub(crate) struct Bvh {
    nodes: Vec<BvhNode>,
    prim_indices: Vec<u32>,
}

impl Bvh {
    const DEFAULT_LEAF_SIZE: usize = 4;

    #[must_use]
    pub(crate) fn build(bboxes: &[BBox]) -> Option<Self> {
        Self::build_with_leaf_size(bboxes, Self::DEFAULT_LEAF_SIZE)
    }

    #[must_use]
    pub(crate) fn build_with_leaf_size(bboxes: &[BBox], leaf_size: usize) -> Option<Self> {
        if bboxes.is_empty() || u32::try_from(bboxes.len()).is_err() {
            return None;
        }

        let leaf_size = leaf_size.clamp(1, 64);
        let mut bvh = Self {
            nodes: Vec::with_capacity(bboxes.len().saturating_mul(2)),
            prim_indices: (0..bboxes.len() as u32).collect(),
        };
        bvh.build_node(bboxes, 0, bboxes.len(), leaf_size);
        Some(bvh)
    }

    #[must_use]
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn build_node(&mut self, bboxes: &[BBox], start: usize, end: usize, leaf_size: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let bbox = self.prim_indices[start + 1..end]
            .iter()
            .fold(bboxes[self.prim_indices[start] as usize], |acc, &idx| {
                acc.union(bboxes[idx as usize])
            });
        self.nodes.push(BvhNode::leaf(bbox, start as u32, (end - start) as u32));

        let count = end - start;
        if count <= leaf_size {
            return node_index;
        }

        let axis = self.widest_centroid_axis(bboxes, start, end);
        let mid = start + count / 2;
        self.prim_indices[start..end].select_nth_unstable_by(mid - start, |a, b| {
            let ca = axis_component(bboxes[*a as usize].center(), axis);
            let cb = axis_component(bboxes[*b as usize].center(), axis);
            ca.total_cmp(&cb)
        });

        let left = self.build_node(bboxes, start, mid, leaf_size);
        let right = self.build_node(bboxes, mid, end, leaf_size);
        self.nodes[node_index as usize] = BvhNode::inner(bbox, left, right);
        node_index
    }

    fn widest_centroid_axis(&self, bboxes: &[BBox], start: usize, end: usize) -> u8 {
        let first = bboxes[self.prim_indices[start] as usize].center();
        let spread = self.prim_indices[start + 1..end]
            .iter()
            .fold(BBox::new(first, first), |acc, &idx| {
                acc.expand_point(bboxes[idx as usize].center())
            });
        let extent = spread.max.sub_point(spread.min);

        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    /// Walks every leaf whose box the ray crosses within `[t_min, t_max]`.
    ///
    /// `visit` receives a primitive index and the current upper bound; it returns
    /// a (possibly tighter) upper bound so closest-hit searches can prune the
    /// remaining traversal. Nearer children are visited first.
    pub(crate) fn query_ray<F>(&self, ray: &Ray, t_min: f64, t_max: f64, mut visit: F)
    where
        F: FnMut(usize, f64) -> f64,
    {
        if self.nodes.is_empty() || !ray.origin.is_finite() || !ray.dir.is_finite() {
            return;
        }

        let mut bound = t_max;
        let mut stack = vec![0u32];

        while let Some(node_idx) = stack.pop() {
            let node = self.nodes[node_idx as usize];
            if ray.slab_entry(node.bbox, t_min, bound).is_none() {
                continue;
            }

            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    bound = visit(prim as usize, bound).min(bound);
                }
                continue;
            }

            let left = self.nodes[node.left as usize].bbox;
            let right = self.nodes[node.right as usize].bbox;
            let t_left = ray.slab_entry(left, t_min, bound);
            let t_right = ray.slab_entry(right, t_min, bound);
            match (t_left, t_right) {
                (Some(tl), Some(tr)) => {
                    // Push the farther child first so the nearer one pops next.
                    if tl <= tr {
                        stack.push(node.right);
                        stack.push(node.left);
                    } else {
                        stack.push(node.left);
                        stack.push(node.right);
                    }
                }
                (Some(_), None) => stack.push(node.left),
                (None, Some(_)) => stack.push(node.right),
                (None, None) => {}
            }
        }
    }
}

fn axis_component(p: Point3, axis: u8) -> f64 {
    match axis {
        0 => p.x,
        1 => p.y,
        _ => p.z,
    }
}
