//! End-to-end collision scenarios on cube meshes, across every tree layout.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{cube_mesh, median_split_tree, tri_tri_overlap};

use collide_core::{
    BuildSettings, ContactMode, Model, PairCache, Plane, PlanesCache, PlanesCollider, TreeCollider,
    TreeColliderSettings, TreeLayout,
};
use nalgebra::{Isometry3, Point3, Unit, Vector3};

fn all_layouts() -> [TreeLayout; 4] {
    [
        TreeLayout::Collision,
        TreeLayout::NoLeaf,
        TreeLayout::Quantized,
        TreeLayout::QuantizedNoLeaf,
    ]
}

fn cube_model(layout: TreeLayout) -> (Model, collide_core::TriMesh) {
    let mesh = cube_mesh(Point3::origin());
    let model = Model::build(
        &median_split_tree(&mesh),
        BuildSettings {
            layout,
            fix_quantized: true,
        },
    )
    .unwrap();
    (model, mesh)
}

#[test]
fn separated_cubes_do_not_touch() {
    for layout in all_layouts() {
        let (model, mesh) = cube_model(layout);
        let mut collider = TreeCollider::new(tri_tri_overlap);
        let report = collider
            .collide(
                &mut PairCache::new(),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::translation(0.0, 0.0, 3.0),
            )
            .unwrap();
        assert!(!report.contact, "{layout:?}");
        assert!(report.pairs.is_empty(), "{layout:?}");
    }
}

#[test]
fn overlapping_cubes_touch() {
    for layout in all_layouts() {
        let (model, mesh) = cube_model(layout);
        let mut collider = TreeCollider::new(tri_tri_overlap);
        let report = collider
            .collide(
                &mut PairCache::new(),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::translation(0.0, 0.0, 1.5),
            )
            .unwrap();
        assert!(report.contact, "{layout:?}");
        assert!(!report.pairs.is_empty(), "{layout:?}");
    }
}

#[test]
fn rotated_cube_contact() {
    let axis = Unit::new_normalize(Vector3::new(1.0, 1.0, 0.3));
    let world1 = Isometry3::new(
        Vector3::new(0.4, -0.2, 1.6),
        axis.into_inner() * std::f32::consts::FRAC_PI_4,
    );
    for layout in all_layouts() {
        let (model, mesh) = cube_model(layout);
        let mut collider = TreeCollider::new(tri_tri_overlap);
        let report = collider
            .collide(
                &mut PairCache::new(),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &world1,
            )
            .unwrap();
        assert!(report.contact, "{layout:?}");
    }
}

#[test]
fn reported_pairs_really_intersect() {
    let world1 = Isometry3::translation(0.7, 0.4, 1.5);
    let (model, mesh) = cube_model(TreeLayout::QuantizedNoLeaf);
    let mut collider = TreeCollider::new(tri_tri_overlap);
    let report = collider
        .collide(
            &mut PairCache::new(),
            &model,
            &mesh,
            &Isometry3::identity(),
            &model,
            &mesh,
            &world1,
        )
        .unwrap();
    assert!(report.contact);

    use collide_core::MeshInterface;
    let to_frame0 = world1; // world0 is the identity
    let rot = to_frame0.rotation.to_rotation_matrix().into_inner();
    let trans = to_frame0.translation.vector;
    for pair in &report.pairs {
        let t0 = mesh.triangle(pair.id0);
        let t1 = mesh.triangle(pair.id1).transformed(&rot, &trans);
        assert!(
            tri_tri_overlap(&t0, &t1),
            "reported pair ({}, {}) does not intersect",
            pair.id0,
            pair.id1
        );
    }
}

#[test]
fn first_contact_reports_one_pair() {
    let (model, mesh) = cube_model(TreeLayout::NoLeaf);
    let mut collider = TreeCollider::with_settings(
        tri_tri_overlap,
        TreeColliderSettings {
            mode: ContactMode::FirstContact,
            ..TreeColliderSettings::default()
        },
    );
    let all_pairs = {
        let mut all = TreeCollider::new(tri_tri_overlap);
        all.collide(
            &mut PairCache::new(),
            &model,
            &mesh,
            &Isometry3::identity(),
            &model,
            &mesh,
            &Isometry3::translation(0.0, 0.0, 1.5),
        )
        .unwrap()
        .pairs
    };
    let report = collider
        .collide(
            &mut PairCache::new(),
            &model,
            &mesh,
            &Isometry3::identity(),
            &model,
            &mesh,
            &Isometry3::translation(0.0, 0.0, 1.5),
        )
        .unwrap();
    assert_eq!(report.pairs.len(), 1);
    assert!(all_pairs.contains(&report.pairs[0]));
}

#[test]
fn refit_tracks_deformation() {
    let mesh = cube_mesh(Point3::origin());
    let mut moving = mesh.clone();
    let mut model = Model::build(
        &median_split_tree(&moving),
        BuildSettings {
            layout: TreeLayout::NoLeaf,
            fix_quantized: true,
        },
    )
    .unwrap();
    let (other_model, other_mesh) = cube_model(TreeLayout::NoLeaf);

    let mut collider = TreeCollider::new(tri_tri_overlap);
    let world1 = Isometry3::translation(0.0, 0.0, 3.5);
    let before = collider
        .collide(
            &mut PairCache::new(),
            &model,
            &moving,
            &Isometry3::identity(),
            &other_model,
            &other_mesh,
            &world1,
        )
        .unwrap();
    assert!(!before.contact);

    // Inflate the cube until it reaches the other one, then refit.
    for v in moving.vertices_mut() {
        v.coords *= 3.0;
    }
    model.refit(&moving).unwrap();
    let after = collider
        .collide(
            &mut PairCache::new(),
            &model,
            &moving,
            &Isometry3::identity(),
            &other_model,
            &other_mesh,
            &world1,
        )
        .unwrap();
    assert!(after.contact);
}

#[test]
fn frustum_culls_cube() {
    // A four-sided frustum looking down +z, wide enough to catch a cube
    // sitting on the axis but not one displaced sideways.
    let planes = [
        Plane::new(Vector3::new(1.0, 0.0, 0.5).normalize(), 2.0),
        Plane::new(Vector3::new(-1.0, 0.0, 0.5).normalize(), 2.0),
        Plane::new(Vector3::new(0.0, 1.0, 0.5).normalize(), 2.0),
        Plane::new(Vector3::new(0.0, -1.0, 0.5).normalize(), 2.0),
    ];
    for layout in all_layouts() {
        let (model, mesh) = cube_model(layout);
        let mut collider = PlanesCollider::new();
        let mut cache = PlanesCache::new();

        let centered = collider
            .collide(
                &mut cache,
                &planes,
                &model,
                &mesh,
                &Isometry3::translation(0.0, 0.0, 5.0),
            )
            .unwrap();
        assert!(centered, "{layout:?}");
        assert_eq!(cache.touched.len(), 12, "{layout:?}");

        let offside = collider
            .collide(
                &mut cache,
                &planes,
                &model,
                &mesh,
                &Isometry3::translation(50.0, 0.0, 5.0),
            )
            .unwrap();
        assert!(!offside, "{layout:?}");
    }
}
