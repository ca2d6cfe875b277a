use super::arch_anchors;
use crate::geom::Point3;
use crate::wire::{
    AdaptiveSampler, ControlPoint, ControlPointArena, CubicOptions, PathStrategy, SamplePlan, StrategyOptions,
    build_generator, turning_angles,
};

fn arch_control_points() -> Vec<ControlPoint> {
    ControlPointArena::from_sorted_anchors(&arch_anchors(6), Point3::new(0.0, 8.0, 0.0), 1.0)
        .as_slice()
        .to_vec()
}

fn positions(cps: &[ControlPoint]) -> Vec<Point3> {
    cps.iter().map(|cp| cp.position).collect()
}

#[test]
fn every_strategy_honours_the_plan_and_pins_the_start() {
    let cps = arch_control_points();
    let plan = SamplePlan::by_length(&positions(&cps), 120, 2);

    for strategy in PathStrategy::ALL {
        let generator = build_generator(strategy, &StrategyOptions::default(), 1.0);
        let path = generator.generate_planned(&cps, &plan).expect("path");

        assert_eq!(generator.strategy(), strategy);
        assert_eq!(path.points.len(), plan.total_points(), "{strategy}");
        if strategy != PathStrategy::CubicSpline {
            assert!(path.points[0].distance_to(cps[0].position) < 1e-9, "{strategy}");
        }
    }
}

#[test]
fn interpolating_strategies_pass_through_control_points() {
    let cps = arch_control_points();
    let plan = SamplePlan::uniform(cps.len() - 1, 97);
    let options = StrategyOptions {
        cubic: CubicOptions { smoothing: 0.0 },
        ..StrategyOptions::default()
    };

    for strategy in [PathStrategy::CatmullRom, PathStrategy::Linear, PathStrategy::CubicSpline] {
        let path = build_generator(strategy, &options, 1.0)
            .generate_planned(&cps, &plan)
            .expect("path");
        for (cp, offset) in cps.iter().zip(plan.offsets()) {
            assert!(
                path.points[offset].distance_to(cp.position) < 1e-6,
                "{strategy} misses control point {}",
                cp.id
            );
        }
        let last = path.points[path.points.len() - 1];
        assert!(last.distance_to(cps[cps.len() - 1].position) < 1e-9, "{strategy}");
    }
}

#[test]
fn curves_turn_more_gently_than_the_polygon() {
    let cps = arch_control_points();
    let plan = SamplePlan::uniform(cps.len() - 1, 200);
    let max_turn = |points: &[Point3]| turning_angles(points).into_iter().fold(0.0, f64::max);

    let linear = build_generator(PathStrategy::Linear, &StrategyOptions::default(), 1.0)
        .generate_planned(&cps, &plan)
        .expect("linear");
    let corner = max_turn(&linear.points);

    for strategy in [PathStrategy::CatmullRom, PathStrategy::CubicSpline, PathStrategy::BSpline] {
        let path = build_generator(strategy, &StrategyOptions::default(), 1.0)
            .generate_planned(&cps, &plan)
            .expect("path");
        let turn = max_turn(&path.points);
        assert!(turn < 0.5 * corner, "{strategy}: {turn} vs polygon {corner}");
    }
}

#[test]
fn adaptive_plan_favours_the_curved_part() {
    // Straight run along x followed by a tight hook.
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(20.0, 0.0, 0.0),
        Point3::new(30.0, 0.0, 0.0),
        Point3::new(35.0, 5.0, 0.0),
        Point3::new(30.0, 10.0, 0.0),
    ];
    let plan = AdaptiveSampler::default().plan(&points, 101);

    assert_eq!(plan.total_points(), 101);
    let straight = plan.per_segment[0];
    let hook = plan.per_segment[4];
    let hook_length = points[4].distance_to(points[5]);
    assert!(
        hook as f64 / hook_length > straight as f64 / 10.0,
        "hook {hook} over {hook_length} mm vs straight {straight} over 10 mm"
    );
    assert!(AdaptiveSampler::adaptive_budget(100, &points) > 100);
}

#[test]
fn physics_strategy_stays_near_the_control_points() {
    let cps = arch_control_points();
    let plan = SamplePlan::by_length(&positions(&cps), 80, 2);
    let path = build_generator(PathStrategy::PhysicsBased, &StrategyOptions::default(), 1.0)
        .generate_planned(&cps, &plan)
        .expect("physics");

    for cp in cps.iter().filter(|cp| cp.is_anchor()) {
        let nearest = path
            .points
            .iter()
            .map(|p| p.distance_to(cp.position))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest < 2.0, "anchor {} is {nearest} mm from the wire", cp.id);
    }
    let end = path.points[path.points.len() - 1];
    assert!(end.distance_to(cps[cps.len() - 1].position) < 1e-9);
}
