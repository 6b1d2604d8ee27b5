use tiny_skia_pipeline::*;

const RED: GradientColor = GradientColor { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
const GREEN: GradientColor = GradientColor { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
const BLUE: GradientColor = GradientColor { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };

// Renders a 5 pixel row with `t` in 0, 0.25, 0.5, 0.75 and 1.
fn render(stage: Stage, ctx: Context, force_hq: bool) -> [u8; 20] {
    let mut pixels = [0; 20];
    {
        let pixels_ctx = MemoryCtx::new(&mut pixels, 5);

        let mut p = RasterPipelineBuilder::new();
        p.set_force_hq_pipeline(force_hq);
        p.push(Stage::SeedShader).unwrap();
        p.push_transform(Transform::from_row(0.25, 0.0, 0.0, 1.0, -0.125, 0.0)).unwrap();
        p.push_with_context(stage, ctx).unwrap();
        p.push_with_context(Stage::Store8888, Context::Memory(&pixels_ctx)).unwrap();
        let p = p.compile();
        assert_eq!(p.is_lowp(), !force_hq);
        p.run(0, 0, 5, 1).unwrap();
    }

    pixels
}

#[test]
fn two_stops() {
    let stops = [
        GradientStop::new(0.0, Color::from_rgba8(255, 0, 0, 255)),
        GradientStop::new(1.0, Color::from_rgba8(0, 0, 255, 255)),
    ];
    let ctx = GradientCtx::from_stops(&stops, false).unwrap();

    for &force_hq in &[false, true] {
        assert_eq!(
            render(Stage::Gradient, Context::Gradient(&ctx), force_hq),
            [
                255, 0,   0, 255,
                191, 0,  64, 255,
                128, 0, 128, 255,
                 64, 0, 191, 255,
                  0, 0, 255, 255,
            ]
        );
    }
}

#[test]
fn evenly_spaced_two_stops() {
    let ctx = EvenlySpaced2StopGradientCtx::new(RED, BLUE);
    for &force_hq in &[false, true] {
        assert_eq!(
            render(Stage::EvenlySpaced2StopGradient, Context::TwoStopGradient(&ctx), force_hq),
            [
                255, 0,   0, 255,
                191, 0,  64, 255,
                128, 0, 128, 255,
                 64, 0, 191, 255,
                  0, 0, 255, 255,
            ]
        );
    }
}

#[test]
fn evenly_spaced_hits_every_color() {
    let ctx = GradientCtx::evenly_spaced(&[RED, GREEN, BLUE], false).unwrap();
    for &force_hq in &[false, true] {
        assert_eq!(
            render(Stage::EvenlySpacedGradient, Context::Gradient(&ctx), force_hq),
            [
                255,   0,   0, 255,
                128, 128,   0, 255,
                  0, 255,   0, 255,
                  0, 128, 128, 255,
                  0,   0, 255, 255,
            ]
        );
    }
}

#[test]
fn hard_stop() {
    // Two stops at the same position produce a hard edge.
    let stops = [
        GradientStop::new(0.0, Color::BLACK),
        GradientStop::new(0.5, Color::BLACK),
        GradientStop::new(0.5, Color::WHITE),
        GradientStop::new(1.0, Color::WHITE),
    ];
    let ctx = GradientCtx::from_stops(&stops, false).unwrap();

    let pixels = render(Stage::Gradient, Context::Gradient(&ctx), false);
    let reds: Vec<u8> = pixels.chunks(4).map(|px| px[0]).collect();
    assert_eq!(reds, [0, 0, 255, 255, 255]);
}

#[test]
fn premultiplied_gradient_never_exceeds_alpha() {
    // Already premultiplied colors, interpolated as is.
    let stops = [
        GradientStop::new(0.0, Color::WHITE),
        GradientStop::new(1.0, Color::TRANSPARENT),
    ];
    let ctx = GradientCtx::from_stops(&stops, true).unwrap();

    for &force_hq in &[false, true] {
        let pixels = render(Stage::Gradient, Context::Gradient(&ctx), force_hq);
        for px in pixels.chunks(4) {
            assert_eq!([px[0], px[1], px[2]], [px[3]; 3]);
        }
        assert_eq!(&pixels[4..8], &[191, 191, 191, 191]);
        assert_eq!(&pixels[16..], &[0, 0, 0, 0]);
    }
}

#[test]
fn radial_distance() {
    // A unit radius centered at the first pixel.
    let mut pixels = [0; 4 * 4];
    let pixels_ctx = MemoryCtx::new(&mut pixels, 4);
    let stops = [
        GradientStop::new(0.0, Color::WHITE),
        GradientStop::new(1.0, Color::BLACK),
    ];
    let ctx = GradientCtx::from_stops(&stops, false).unwrap();

    let mut p = RasterPipelineBuilder::new();
    p.push(Stage::SeedShader).unwrap();
    p.push_transform(Transform::from_row(0.5, 0.0, 0.0, 1.0, -0.25, -0.5)).unwrap();
    p.push(Stage::XyToRadius).unwrap();
    p.push_with_context(Stage::Gradient, Context::Gradient(&ctx)).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&pixels_ctx)).unwrap();
    p.compile().run(0, 0, 4, 1).unwrap();

    let reds: Vec<u8> = pixels.chunks(4).map(|px| px[0]).collect();
    assert_eq!(reds, [255, 128, 0, 0]);
}
