use glam::{Mat4, Quat, Vec3};
use siho::camera3d::{Camera, LightFrame, PerspectiveCamera};
use siho::config::ShadowConfig;
use siho::renderer::recording::{RecordedCommand, RecordedMesh, RecordingBackend, RecordingCommands, RecordingDevice};
use siho::renderer::{AccessFlags, ImageLayout, PipelineStages, ShadowCaster, ShadowRenderPass};

fn initialized_pass(config: &ShadowConfig) -> ShadowRenderPass<RecordingBackend> {
    let camera: Camera =
        PerspectiveCamera::new(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, 1.0, 1.5, 0.1, 500.0).into();
    let light = LightFrame::new(Quat::from_rotation_x(-0.9), Vec3::ZERO);
    let mut device = RecordingDevice::default();
    let mut pass = ShadowRenderPass::new(config);
    pass.init(&mut device, &camera, &light).expect("init");
    pass
}

#[test]
fn one_entry_and_one_exit_barrier_bracket_every_frame() {
    let config = ShadowConfig { cascade_count: 4, frames_in_flight: 3, ..ShadowConfig::default() };
    let mut pass = initialized_pass(&config);
    let meshes = [RecordedMesh(0), RecordedMesh(1)];
    let casters: Vec<_> = meshes.iter().map(|mesh| ShadowCaster::new(mesh, Mat4::IDENTITY)).collect();

    for step in 0..9 {
        let frame = step % 3;
        let mut commands = RecordingCommands::default();
        pass.draw(frame, &mut commands, &casters);

        let barriers: Vec<_> = commands.barriers().collect();
        assert_eq!(barriers.len(), 2, "frame {frame}");
        let stream = &commands.commands;
        assert!(matches!(stream.first(), Some(RecordedCommand::Barrier { .. })));
        assert!(matches!(stream.last(), Some(RecordedCommand::Barrier { .. })));

        let (entry_view, entry) = barriers[0];
        let (exit_view, exit) = barriers[1];
        assert_eq!(entry_view, pass.array_view(frame));
        assert_eq!(exit_view, pass.array_view(frame));
        assert_eq!((entry.base_layer, entry.layer_count), (0, 4));
        assert_eq!((exit.base_layer, exit.layer_count), (0, 4));

        let expected_old = if step < 3 { ImageLayout::Undefined } else { ImageLayout::ShaderReadOnly };
        assert_eq!(entry.old_layout, expected_old);
        assert_eq!(entry.new_layout, ImageLayout::DepthAttachment);
        assert_eq!(entry.src_stages, PipelineStages::TOP_OF_PIPE);
        assert!(entry.dst_access.contains(AccessFlags::DEPTH_STENCIL_WRITE));

        assert_eq!(exit.old_layout, ImageLayout::DepthAttachment);
        assert_eq!(exit.new_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(exit.dst_stages, PipelineStages::FRAGMENT_SHADER);
        assert_eq!(exit.src_access, AccessFlags::DEPTH_STENCIL_WRITE);
        assert_eq!(exit.dst_access, AccessFlags::SHADER_READ);

        let targets: Vec<_> = commands.depth_passes().collect();
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().all(|target| target.image == entry_view.image && target.layer_count == 1));
        assert_eq!(commands.draw_count(), 8);
        assert_eq!(pass.image_layout(frame), ImageLayout::ShaderReadOnly);
    }
}

#[test]
fn frames_in_flight_use_distinct_images() {
    let mut pass = initialized_pass(&ShadowConfig::default());
    let mut commands = RecordingCommands::default();
    pass.draw(0, &mut commands, &[]);
    pass.draw(1, &mut commands, &[]);
    let images: Vec<u64> = commands.barriers().map(|(view, _)| view.image).collect();
    assert_eq!(images.len(), 4);
    assert_eq!(images[0], images[1]);
    assert_eq!(images[2], images[3]);
    assert_ne!(images[0], images[2]);
}

#[test]
#[should_panic(expected = "out of range")]
fn drawing_an_unknown_frame_panics() {
    let mut pass = initialized_pass(&ShadowConfig::default());
    let mut commands = RecordingCommands::default();
    pass.draw(2, &mut commands, &[]);
}
