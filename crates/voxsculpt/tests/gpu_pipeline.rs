//! Runs the simulation passes on a real device and checks them against the
//! host kernel. Every test returns early when no adapter is available.

use glam::{Vec2, Vec4};
use voxfield::{encode_rgba8, Brush, GridLayout, HostField, ImportPayload};
use voxsculpt::{
    camera::CameraRig,
    renderer::{
        context::Gpu,
        simulation::{data_target, encode_texels, read_target, SimField, SimulationPipeline},
    },
};

fn headless_gpu() -> Option<Gpu> {
    match pollster::block_on(Gpu::headless()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {}", err);
            None
        }
    }
}

fn small_layout() -> GridLayout {
    GridLayout::new(27).unwrap()
}

fn tolerance(gpu: &Gpu) -> f32 {
    match gpu.sim_format {
        wgpu::TextureFormat::Rgba16Float => 1e-3,
        _ => 1e-6,
    }
}

fn assert_texels_close(actual: &[[f32; 4]], expected: &[Vec4], tol: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let diff = (Vec4::from_array(*a) - *e).abs().max_element();
        assert!(diff <= tol, "texel {}: got {:?}, expected {:?}", i, a, e);
    }
}

fn still_params(dt: f32, brush: Brush) -> voxfield::FrameParams {
    CameraRig::new(800, 600).frame_params(dt, brush)
}

#[test]
fn copy_round_trip_is_exact() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let sim = SimulationPipeline::new(&gpu, layout).unwrap();

    let a = data_target(&gpu, "Copy A", &layout).unwrap();
    let b = data_target(&gpu, "Copy B", &layout).unwrap();

    // Eighths in [-2, 6) are exact in both float formats.
    let texels: Vec<[f32; 4]> = (0..layout.voxel_count())
        .map(|i| {
            let v = (i % 64) as f32 / 8.0 - 2.0;
            [v, -v, v * 0.5, 1.0]
        })
        .collect();
    a.color().upload(&gpu.queue, &encode_texels(gpu.sim_format, &texels));

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    sim.copy_texture(&gpu, &mut encoder, &a.color().view, &b);
    sim.copy_texture(&gpu, &mut encoder, &b.color().view, &a);
    gpu.queue.submit(std::iter::once(encoder.finish()));

    assert_eq!(read_target(&gpu, &a).unwrap(), texels);
}

#[test]
fn seeded_field_sits_on_the_lattice() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let sim = SimulationPipeline::new(&gpu, layout).unwrap();
    let rest = layout.rest_field();

    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &rest, tolerance(&gpu));

    let desired = sim.read_field(&gpu, SimField::Desired).unwrap();
    assert_texels_close(&desired, &rest, tolerance(&gpu));

    let velocity = sim.read_field(&gpu, SimField::Velocity).unwrap();
    assert!(velocity.iter().flatten().all(|c| *c == 0.0));
}

#[test]
fn field_at_rest_stays_put() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();
    let params = still_params(1.0 / 60.0, Brush::INACTIVE);

    for _ in 0..60 {
        sim.step(&gpu, &params);
    }

    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &layout.rest_field(), tolerance(&gpu));
}

#[test]
fn brushed_steps_track_the_host_kernel() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();
    let mut host = HostField::seeded(layout);

    let brush = Brush {
        plane: Vec2::new(0.55, 0.5),
        radius: 0.3,
        active: true,
    };
    let params = still_params(1.0 / 30.0, brush);
    for _ in 0..3 {
        sim.step(&gpu, &params);
        host.step(&params);
    }

    assert!(host.max_displacement() > 0.0);
    let tol = match gpu.sim_format {
        wgpu::TextureFormat::Rgba16Float => 2e-2,
        _ => 1e-3,
    };
    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &host.position, tol);
}

#[test]
fn field_import_becomes_the_rest_shape() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();

    // Disturb the velocities first so the import has something to clear.
    let brush = Brush {
        plane: Vec2::splat(0.5),
        radius: 0.5,
        active: true,
    };
    sim.step(&gpu, &still_params(1.0 / 30.0, brush));

    let shape: Vec<Vec4> = layout
        .rest_field()
        .iter()
        .map(|p| (p.truncate() * 0.5 + 0.25).extend(1.0))
        .collect();
    let texels: Vec<[f32; 4]> = shape.iter().map(|p| p.to_array()).collect();
    sim.import(&gpu, &ImportPayload::Field(texels)).unwrap();

    let tol = tolerance(&gpu);
    assert_texels_close(&sim.read_field(&gpu, SimField::Position).unwrap(), &shape, tol);
    assert_texels_close(&sim.read_field(&gpu, SimField::Desired).unwrap(), &shape, tol);
    let velocity = sim.read_field(&gpu, SimField::Velocity).unwrap();
    assert!(velocity.iter().flatten().all(|c| *c == 0.0));
}

#[test]
fn bitmap_import_fills_the_grid() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();

    let payload = ImportPayload::Bitmap {
        width: 1,
        height: 1,
        rgba8: vec![255, 0, 51, 255],
    };
    sim.import(&gpu, &payload).unwrap();

    let expected = vec![Vec4::new(1.0, 0.0, 0.2, 1.0); layout.voxel_count() as usize];
    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &expected, 2e-3);
}

#[test]
fn malformed_import_leaves_the_field_alone() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();

    let short = ImportPayload::Field(vec![[0.0; 4]; 3]);
    assert!(sim.import(&gpu, &short).is_err());

    let ragged = ImportPayload::Bitmap {
        width: 2,
        height: 2,
        rgba8: vec![0; 5],
    };
    assert!(sim.import(&gpu, &ragged).is_err());

    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &layout.rest_field(), tolerance(&gpu));
}

#[test]
fn bitmap_over_the_texture_limit_is_rejected() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let mut sim = SimulationPipeline::new(&gpu, layout).unwrap();

    let width = gpu.device.limits().max_texture_dimension_2d + 1;
    let wide = ImportPayload::Bitmap {
        width,
        height: 1,
        rgba8: vec![255; width as usize * 4],
    };
    assert!(wide.validate(&layout).is_ok());
    assert!(matches!(
        sim.import(&gpu, &wide),
        Err(voxsculpt::error::GfxError::Payload(_))
    ));

    let position = sim.read_field(&gpu, SimField::Position).unwrap();
    assert_texels_close(&position, &layout.rest_field(), tolerance(&gpu));
}

#[test]
fn export_matches_the_host_encoding() {
    let Some(gpu) = headless_gpu() else { return };
    let layout = small_layout();
    let sim = SimulationPipeline::new(&gpu, layout).unwrap();

    let bytes = sim.read_position_rgba8(&gpu).unwrap();
    let expected = encode_rgba8(&layout.rest_field());
    assert_eq!(bytes.len(), expected.len());
    for (i, (a, e)) in bytes.iter().zip(&expected).enumerate() {
        assert!(a.abs_diff(*e) <= 1, "byte {}: {} vs {}", i, a, e);
    }
}
