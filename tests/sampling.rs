use tiny_skia_pipeline::*;

// A 2x1 image: black and white.
const BLACK_WHITE: [u8; 8] = [0, 0, 0, 255, 255, 255, 255, 255];

fn sample_row(
    sampler: Stage,
    ctx: Context,
    ts: Transform,
    width: usize,
    height: usize,
    force_hq: bool,
) -> (Vec<u8>, bool) {
    let mut pixels = vec![0; width * height * 4];
    let is_lowp;
    {
        let pixels_ctx = MemoryCtx::new(&mut pixels, width);
        let mut p = RasterPipelineBuilder::new();
        p.set_force_hq_pipeline(force_hq);
        p.push(Stage::SeedShader).unwrap();
        p.push_transform(ts).unwrap();
        p.push_with_context(sampler, ctx).unwrap();
        p.push_with_context(Stage::Store8888, Context::Memory(&pixels_ctx)).unwrap();
        let p = p.compile();
        is_lowp = p.is_lowp();
        p.run(0, 0, width, height).unwrap();
    }

    (pixels, is_lowp)
}

fn reds(pixels: &[u8]) -> Vec<u8> {
    pixels.chunks(4).map(|px| px[0]).collect()
}

#[test]
fn bilinear_at_centers_and_midpoints() {
    let gather = GatherCtx::new(&BLACK_WHITE, 2, 2, 1).unwrap();
    let sampler = SamplerCtx::new(gather, SpreadMode::Pad);

    // x = 0.5, 1.0, 1.5, 2.0
    let ts = Transform::from_row(0.5, 0.0, 0.0, 1.0, 0.25, 0.0);

    let (pixels, is_lowp) = sample_row(Stage::Bilinear, Context::Sampler(&sampler), ts, 4, 1, false);
    assert!(!is_lowp);
    assert_eq!(reds(&pixels), [0, 128, 255, 255]);
    assert!(pixels.chunks(4).all(|px| px[3] == 255));

    for &force_hq in &[false, true] {
        let (pixels, is_lowp) =
            sample_row(Stage::BilerpClamp8888, Context::Gather(&gather), ts, 4, 1, force_hq);
        assert_eq!(is_lowp, !force_hq);
        assert_eq!(reds(&pixels), [0, 128, 255, 255]);
        assert!(pixels.chunks(4).all(|px| px[3] == 255));
    }
}

#[test]
fn spread_modes() {
    let gather = GatherCtx::new(&BLACK_WHITE, 2, 2, 1).unwrap();

    // The left edge of the image, halfway between the first pixel and whatever is on its left.
    let ts = Transform::from_translate(-0.5, 0.0);

    let sample = |mode| {
        let sampler = SamplerCtx::new(gather, mode);
        let (pixels, _) = sample_row(Stage::Bilinear, Context::Sampler(&sampler), ts, 1, 1, false);
        pixels[0]
    };

    assert_eq!(sample(SpreadMode::Pad), 0);
    assert_eq!(sample(SpreadMode::Repeat), 128);
    assert_eq!(sample(SpreadMode::Reflect), 0);
}

#[test]
fn gather_never_reads_outside_of_image() {
    // A 2x2 image with a stride of 3. The third column is never a part of the image.
    let poison = [1, 2, 3, 4];
    let image: Vec<u8> = [
        [10, 20, 30, 255], [40, 50, 60, 255], poison,
        [70, 80, 90, 255], [100, 110, 120, 255], poison,
    ]
    .iter()
    .flat_map(|px| px.to_vec())
    .collect();
    let gather = GatherCtx::new(&image, 3, 2, 2).unwrap();

    // x = -1.5 ..= 3.5, y = 0.5 and 4.5
    let ts = Transform::from_row(1.0, 0.0, 0.0, 4.0, -2.0, -1.5);

    for &force_hq in &[false, true] {
        let (pixels, is_lowp) =
            sample_row(Stage::Gather8888, Context::Gather(&gather), ts, 6, 2, force_hq);
        assert_eq!(is_lowp, !force_hq);

        let expected: Vec<u8> = [0, 0, 0, 4, 4, 4, 12, 12, 12, 16, 16, 16]
            .iter()
            .flat_map(|offset| image[*offset..*offset + 4].to_vec())
            .collect();
        assert_eq!(pixels, expected);
    }
}

#[test]
fn scratch_bilinear_matches_fused() {
    let image: Vec<u8> = (0..3 * 3 * 4).map(|i| (i * 29 % 256) as u8).collect();
    let gather = GatherCtx::new(&image, 3, 3, 3).unwrap();
    let sampler = SamplerCtx::new(gather, SpreadMode::Pad);
    let ts = Transform::from_row(0.3, 0.1, -0.2, 0.4, 0.15, 0.05);

    let (w, h) = (9, 7);
    let (fused, _) = sample_row(Stage::Bilinear, Context::Sampler(&sampler), ts, w, h, false);

    let mut scratch = vec![0; w * h * 4];
    {
        let ctx = MemoryCtx::new(&mut scratch, w);
        let mut p = RasterPipelineBuilder::new();
        p.push(Stage::SeedShader).unwrap();
        p.push_transform(ts).unwrap();
        p.push(Stage::SaveXy).unwrap();
        for &(x, y) in &[
            (Stage::BilinearNx, Stage::BilinearNy),
            (Stage::BilinearPx, Stage::BilinearNy),
            (Stage::BilinearNx, Stage::BilinearPy),
            (Stage::BilinearPx, Stage::BilinearPy),
        ] {
            p.push(x).unwrap();
            p.push(y).unwrap();
            p.push_with_context(Stage::Gather8888, Context::Gather(&gather)).unwrap();
            p.push(Stage::Accumulate).unwrap();
        }
        p.push(Stage::MoveDestinationToSource).unwrap();
        p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
        p.compile().run(0, 0, w, h).unwrap();
    }

    for (a, b) in fused.iter().zip(scratch.iter()) {
        assert!((i32::from(*a) - i32::from(*b)).abs() <= 1, "{} vs {}", a, b);
    }
}

#[test]
fn bicubic_keeps_solid_color() {
    let image: Vec<u8> = [200, 100, 50, 255].iter().cycle().take(4 * 4 * 4).cloned().collect();
    let gather = GatherCtx::new(&image, 4, 4, 4).unwrap();
    let sampler = SamplerCtx::new(gather, SpreadMode::Repeat);
    let ts = Transform::from_row(0.37, 0.0, 0.0, 0.41, 0.13, 0.29);

    let (pixels, _) = sample_row(Stage::Bicubic, Context::Sampler(&sampler), ts, 5, 3, false);
    for px in pixels.chunks(4) {
        for (c, expected) in px.iter().zip([200, 100, 50, 255].iter()) {
            assert!((i32::from(*c) - *expected).abs() <= 1, "{:?}", px);
        }
    }
}
