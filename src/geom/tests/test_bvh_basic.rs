use crate::geom::bvh::{Bvh, Ray};
use crate::geom::{BBox, Point3, Vec3};

fn unit_boxes_along_x(count: usize) -> Vec<BBox> {
    (0..count)
        .map(|i| {
            let x = i as f64 * 2.0;
            BBox::new(Point3::new(x, -0.5, -0.5), Point3::new(x + 1.0, 0.5, 0.5))
        })
        .collect()
}

#[test]
fn bvh_build_rejects_empty_input() {
    assert!(Bvh::build(&[]).is_none());
}

#[test]
fn bvh_query_ray_visits_only_crossed_primitives() {
    let bboxes = vec![
        BBox::new(Point3::new(0.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0)),
        BBox::new(Point3::new(0.0, 2.0, -1.0), Point3::new(1.0, 3.0, 1.0)),
        BBox::new(Point3::new(5.0, -0.5, -0.5), Point3::new(6.0, 0.5, 0.5)),
    ];

    let bvh = Bvh::build_with_leaf_size(&bboxes, 1).expect("bvh build");
    let ray = Ray::new(Point3::new(-1.0, 0.0, 0.0), Vec3::X);

    let mut hits = Vec::new();
    bvh.query_ray(&ray, 0.0, f64::INFINITY, |idx, bound| {
        hits.push(idx);
        bound
    });
    hits.sort_unstable();

    assert_eq!(hits, vec![0, 2]);
}

#[test]
fn bvh_query_ray_prunes_with_tightened_bound() {
    let bboxes = unit_boxes_along_x(16);
    let bvh = Bvh::build_with_leaf_size(&bboxes, 1).expect("bvh build");
    assert!(bvh.node_count() >= 16);

    let ray = Ray::new(Point3::new(-1.0, 0.0, 0.0), Vec3::X);
    let mut visited = Vec::new();
    bvh.query_ray(&ray, 0.0, f64::INFINITY, |idx, _bound| {
        visited.push(idx);
        // Entry distance of the box along +X from the ray origin.
        bboxes[idx].min.x + 1.0
    });

    assert_eq!(visited.first().copied(), Some(0));
    assert!(visited.len() < bboxes.len(), "far boxes should be pruned: {visited:?}");
}
