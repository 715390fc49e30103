use glam::{EulerRot, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siho::camera3d::{Camera, LightFrame, PerspectiveCamera};
use siho::config::ShadowConfig;
use siho::renderer::cascade_fitter::{frustum_corners, CascadeFitter};
use siho::renderer::recording::{RecordingBackend, RecordingDevice};
use siho::renderer::ShadowRenderPass;

fn random_camera(rng: &mut StdRng) -> Option<PerspectiveCamera> {
    let position = Vec3::new(rng.gen_range(-50.0..50.0), rng.gen_range(-10.0..30.0), rng.gen_range(-50.0..50.0));
    let direction = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
    if direction.length() < 0.1 || direction.normalize().y.abs() > 0.95 {
        return None;
    }
    let near = rng.gen_range(0.1..2.0);
    let far = near + rng.gen_range(10.0..500.0);
    Some(PerspectiveCamera::new(
        position,
        position + direction,
        rng.gen_range(30.0_f32..90.0).to_radians(),
        rng.gen_range(0.5..2.5),
        near,
        far,
    ))
}

fn random_light(rng: &mut StdRng) -> LightFrame {
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        rng.gen_range(-3.1..3.1),
        rng.gen_range(-3.1..3.1),
        rng.gen_range(-3.1..3.1),
    );
    LightFrame::new(rotation, Vec3::new(rng.gen_range(-20.0..20.0), 40.0, rng.gen_range(-20.0..20.0)))
}

#[test]
fn fitted_volumes_contain_their_slice_corners() {
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);
    let fitter = CascadeFitter::new(4);
    let mut checked = 0;
    while checked < 200 {
        let Some(camera) = random_camera(&mut rng) else { continue };
        let light = random_light(&mut rng);
        let fits = fitter.fit(&camera, &light).expect("fit");
        let inv_view_proj = camera.view_projection().inverse();
        let light_view = light.view_matrix();

        for fit in &fits {
            let volume = &fit.light_camera;
            let light_view_proj = volume.projection_matrix() * light_view;
            for corner in frustum_corners(inv_view_proj, fit.split_near, fit.split_far) {
                let ndc = light_view_proj.project_point3(corner);
                let tolerance = 1e-3;
                assert!(ndc.x.abs() <= 1.0 + tolerance, "x outside volume: {ndc:?}");
                assert!(ndc.y.abs() <= 1.0 + tolerance, "y outside volume: {ndc:?}");
                assert!((-tolerance..=1.0 + tolerance).contains(&ndc.z), "z outside volume: {ndc:?}");
            }
        }
        checked += 1;
    }
}

#[test]
fn splits_stay_monotonic_for_random_planes() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let near: f32 = rng.gen_range(0.01..10.0);
        let far = near * rng.gen_range(1.5..10_000.0);
        let count = rng.gen_range(1..=4);
        let fitter = CascadeFitter::new(count).with_lambda(rng.gen_range(0.0..=1.0));
        for i in 0..count {
            assert!(fitter.split_distance(i, near, far) < fitter.split_distance(i + 1, near, far));
            assert!(fitter.split_depth(i, near, far) > fitter.split_depth(i + 1, near, far));
        }
    }
}

#[test]
fn repeated_updates_are_bit_identical() {
    let camera: Camera =
        PerspectiveCamera::new(Vec3::new(3.0, 4.0, 10.0), Vec3::ZERO, 1.0, 1.6, 0.3, 300.0).into();
    let light = LightFrame::from_euler_degrees(Vec3::new(-43.0, -89.0, -43.0), Vec3::ZERO);
    let mut device = RecordingDevice::default();
    let mut pass = ShadowRenderPass::<RecordingBackend>::new(&ShadowConfig::default());
    pass.init(&mut device, &camera, &light).expect("init");

    pass.update(&camera, &light).expect("first update");
    let first = pass.cascades().to_vec();
    let first_uniform = pass.shadow_uniform().expect("uniform");
    pass.update(&camera, &light).expect("second update");
    assert_eq!(pass.cascades(), first.as_slice());
    assert_eq!(bytemuck::bytes_of(&pass.shadow_uniform().expect("uniform")), bytemuck::bytes_of(&first_uniform));
}

#[test]
fn farther_cascades_need_deeper_light_volumes() {
    let camera: Camera =
        PerspectiveCamera::new(Vec3::ZERO, Vec3::NEG_Z, 60.0_f32.to_radians(), 1.0, 1.0, 100.0).into();
    let light = LightFrame::new(Quat::from_rotation_x(-45.0_f32.to_radians()), Vec3::ZERO);
    let mut device = RecordingDevice::default();
    let mut pass = ShadowRenderPass::<RecordingBackend>::new(&ShadowConfig::default());
    pass.init(&mut device, &camera, &light).expect("init");
    pass.update(&camera, &light).expect("update");

    let first = pass.light_camera(0).expect("first cascade");
    let third = pass.light_camera(2).expect("third cascade");
    assert!(first.near < third.near, "{} !< {}", first.near, third.near);
    assert!(first.far < third.far, "{} !< {}", first.far, third.far);
    assert!(first.depth_extent() < third.depth_extent());

    let splits = pass.cascade_splits(&camera).expect("splits");
    assert_eq!(splits.len(), 2);
    approx::assert_relative_eq!(
        splits[0],
        siho::renderer::cascade_fitter::reversed_z_depth(19.3208, 1.0, 100.0),
        max_relative = 1e-3
    );
}
