use crate::geom::mesh::finalize_mesh;
use crate::geom::{GeomMesh, Point3, Tolerance};

fn unit_cube() -> (Vec<Point3>, Vec<u32>) {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    // Outward winding.
    let indices = vec![
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // front
        1, 2, 6, 1, 6, 5, // right
        2, 3, 7, 2, 7, 6, // back
        3, 0, 4, 3, 4, 7, // left
    ];
    (points, indices)
}

#[test]
fn finalized_cube_is_solid_with_finite_normals() {
    let (points, indices) = unit_cube();
    let (mesh, diag) = finalize_mesh(points, None, indices, Tolerance::default_geom());

    mesh.validate().expect("mesh validate");
    assert_eq!(diag.vertex_count, 8);
    assert_eq!(diag.triangle_count, 12);
    assert!(diag.is_valid_solid());
    assert_eq!(diag.flipped_triangle_count, 0);

    let normals = mesh.normals.as_ref().expect("normals");
    assert_eq!(normals.len(), mesh.positions.len());
    assert!(normals.iter().flatten().all(|v| v.is_finite()));
    assert_eq!(mesh.positions_flat().len(), mesh.positions.len() * 3);
    assert_eq!(mesh.normals_flat().len(), mesh.positions.len() * 3);
}

#[test]
fn geom_mesh_validate_rejects_bad_buffers() {
    let mesh = GeomMesh {
        positions: vec![[0.0, 0.0, 0.0]],
        indices: vec![0],
        ..Default::default()
    };
    assert!(mesh.validate().is_err());

    let mesh = GeomMesh {
        positions: vec![[0.0, 0.0, 0.0]],
        indices: vec![0, 1, 0],
        ..Default::default()
    };
    assert!(mesh.validate().is_err());

    let mesh = GeomMesh {
        positions: vec![[f64::NAN, 0.0, 0.0]],
        indices: vec![],
        ..Default::default()
    };
    assert!(mesh.validate().is_err());
}
