use crate::geom::{
    Curve3, CurveError, NurbsCurve3, Point3, Tolerance, Vec3, cumulative_arc_lengths,
    parallel_transport_frames, polyline_length,
};

fn quarter_arc_points() -> Vec<Point3> {
    (0..=16)
        .map(|i| {
            let a = std::f64::consts::FRAC_PI_2 * i as f64 / 16.0;
            Point3::new(10.0 * a.cos(), 10.0 * a.sin(), 0.0)
        })
        .collect()
}

#[test]
fn clamped_nurbs_interpolates_endpoints() {
    let cps = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(3.0, 2.0, 1.0),
        Point3::new(4.0, 0.0, 0.0),
    ];
    let curve = NurbsCurve3::clamped_uniform(cps.clone(), 3, None).expect("curve");
    let tol = Tolerance::LOOSE;

    assert!(tol.approx_eq_point3(curve.point_at(0.0), cps[0]));
    assert!(tol.approx_eq_point3(curve.point_at(1.0), cps[3]));
}

#[test]
fn clamped_nurbs_lowers_degree_for_few_points() {
    let cps = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
    let curve = NurbsCurve3::clamped_uniform(cps, 3, None).expect("curve");

    assert_eq!(curve.degree, 1);
    let mid = curve.point_at(0.5);
    assert!(Tolerance::LOOSE.approx_eq_point3(mid, Point3::new(1.0, 0.0, 0.0)));
}

#[test]
fn heavier_weight_pulls_curve_toward_point() {
    let cps = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
    ];
    let plain = NurbsCurve3::clamped_uniform(cps.clone(), 2, None).expect("curve");
    let heavy = NurbsCurve3::clamped_uniform(cps, 2, Some(vec![1.0, 4.0, 1.0])).expect("curve");

    assert!(heavy.point_at(0.5).y > plain.point_at(0.5).y);
}

#[test]
fn nurbs_rejects_bad_weights() {
    let cps = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
    let err = NurbsCurve3::clamped_uniform(cps, 1, Some(vec![1.0, -1.0])).unwrap_err();
    assert_eq!(err, CurveError::InvalidWeights);
}

#[test]
fn arc_lengths_accumulate() {
    let pts = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(3.0, 4.0, 0.0),
        Point3::new(3.0, 4.0, 2.0),
    ];
    assert_eq!(cumulative_arc_lengths(&pts), vec![0.0, 5.0, 7.0]);
    assert!((polyline_length(&pts) - 7.0).abs() < 1e-12);
}

#[test]
fn transported_frames_stay_orthonormal() {
    let rail = quarter_arc_points();
    let (frames, degenerate) = parallel_transport_frames(&rail, Tolerance::default_geom());

    assert_eq!(frames.len(), rail.len());
    assert_eq!(degenerate, 0);
    for f in &frames {
        assert!((f.tangent.length() - 1.0).abs() < 1e-9);
        assert!((f.normal.length() - 1.0).abs() < 1e-9);
        assert!(f.tangent.dot(f.normal).abs() < 1e-9);
        assert!(f.tangent.dot(f.binormal).abs() < 1e-9);
    }
}

#[test]
fn planar_rail_keeps_binormal_consistent() {
    // A planar curve should not twist the frame out of the plane's normal family.
    let rail = quarter_arc_points();
    let (frames, _) = parallel_transport_frames(&rail, Tolerance::default_geom());

    let first_off_plane = frames[0].normal.dot(Vec3::Z).abs().max(frames[0].binormal.dot(Vec3::Z).abs());
    for f in &frames {
        let off_plane = f.normal.dot(Vec3::Z).abs().max(f.binormal.dot(Vec3::Z).abs());
        assert!((off_plane - first_off_plane).abs() < 1e-6);
    }
}
