use tiny_skia_pipeline::*;

// A row that is longer than any chunk width and not a multiple of it.
const WIDTH: usize = 37;
const HEIGHT: usize = 3;

fn test_pixels() -> Vec<u8> {
    (0..WIDTH * HEIGHT * 4).map(|i| (i * 7 % 251) as u8).collect()
}

fn invert_in_place(pixels: &mut [u8], force_hq: bool, isa: Isa, x0: usize, xlimit: usize) {
    let ctx = MemoryCtx::new(pixels, WIDTH);
    let mut p = RasterPipelineBuilder::new();
    p.set_force_hq_pipeline(force_hq);
    p.set_isa(isa);
    p.push_with_context(Stage::Load8888, Context::Memory(&ctx)).unwrap();
    p.push(Stage::Invert).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
    let p = p.compile();
    assert_eq!(p.is_lowp(), !force_hq);
    p.run(x0, 0, xlimit, HEIGHT).unwrap();
}

#[test]
fn tail_matches_full_chunks() {
    for &force_hq in &[false, true] {
        let mut whole = test_pixels();
        invert_in_place(&mut whole, force_hq, Isa::Portable, 0, WIDTH);

        // The same row processed one pixel at a time only ever hits the tail path.
        let mut by_pixel = test_pixels();
        for x in 0..WIDTH {
            invert_in_place(&mut by_pixel, force_hq, Isa::Portable, x, x + 1);
        }

        let expected: Vec<u8> = test_pixels().iter().map(|v| 255 - v).collect();
        assert_eq!(whole, expected);
        assert_eq!(by_pixel, expected);
    }
}

#[test]
fn pixels_outside_of_region_are_untouched() {
    let mut pixels = test_pixels();
    invert_in_place(&mut pixels, false, Isa::Portable, 5, 22);

    let original = test_pixels();
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let i = (y * WIDTH + x) * 4;
            let inside = (5..22).contains(&x);
            for c in 0..4 {
                let expected = if inside { 255 - original[i + c] } else { original[i + c] };
                assert_eq!(pixels[i + c], expected, "{}x{}", x, y);
            }
        }
    }
}

fn hsl_round_trip(isa: Isa) -> Vec<u8> {
    let src = test_pixels();
    let mut dst = vec![0u8; src.len()];
    {
        let src_ctx = MemoryCtx::new_read_only(&src, WIDTH);
        let dst_ctx = MemoryCtx::new(&mut dst, WIDTH);

        let mut p = RasterPipelineBuilder::new();
        p.set_isa(isa);
        p.push_with_context(Stage::Load8888, Context::Memory(&src_ctx)).unwrap();
        p.push(Stage::ForceOpaque).unwrap();
        p.push(Stage::RgbToHsl).unwrap();
        p.push(Stage::HslToRgb).unwrap();
        p.push_with_context(Stage::Store8888, Context::Memory(&dst_ctx)).unwrap();
        let p = p.compile();
        assert!(!p.is_lowp());
        assert_eq!(p.isa(), isa);
        p.run(0, 0, WIDTH, HEIGHT).unwrap();
    }

    dst
}

#[test]
fn highp_widths_agree() {
    // Without AVX on the CPU this still runs 8 lanes with portable stage code.
    assert_eq!(hsl_round_trip(Isa::Portable), hsl_round_trip(Isa::Avx));
}

#[test_log::test]
fn every_instruction_set_matches_portable() {
    assert!(Isa::current().is_available());

    let expected = hsl_round_trip(Isa::Portable);
    let all = [Isa::Sse2, Isa::Sse41, Isa::Avx, Isa::Hsw, Isa::Neon];
    for &isa in &all {
        // Unavailable sets fall back to portable code, so they are safe to run too.
        assert_eq!(hsl_round_trip(isa), expected, "{:?} available: {}", isa, isa.is_available());
    }
}

#[test]
fn lowp_and_highp_agree() {
    let run = |force_hq: bool| {
        let coverage: Vec<u8> = (0..WIDTH * HEIGHT).map(|i| (i * 13 % 256) as u8).collect();
        let coverage_ctx = MemoryCtx::new_read_only(&coverage, WIDTH);

        let mut pixels = test_pixels();
        {
            let ctx = MemoryCtx::new(&mut pixels, WIDTH);

            let color = UniformColorCtx::new(Color::from_rgba8(220, 140, 75, 180).premultiply());
            let mut p = RasterPipelineBuilder::new();
            p.set_force_hq_pipeline(force_hq);
            p.push_with_context(Stage::UniformColor, Context::UniformColor(&color)).unwrap();
            p.push_with_context(Stage::Load8888Dst, Context::Memory(&ctx)).unwrap();
            p.push(Stage::ClampADst).unwrap();
            p.push(Stage::SourceOver).unwrap();
            p.push_with_context(Stage::LerpU8, Context::Memory(&coverage_ctx)).unwrap();
            p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
            let p = p.compile();
            assert_eq!(p.is_lowp(), !force_hq);
            p.run(0, 0, WIDTH, HEIGHT).unwrap();
        }

        pixels
    };

    let lowp = run(false);
    let highp = run(true);
    for (a, b) in lowp.iter().zip(highp.iter()) {
        assert!((i32::from(*a) - i32::from(*b)).abs() <= 1, "{} vs {}", a, b);
    }
}

#[test]
fn swap_rb() {
    let mut pixels = [10, 20, 30, 40, 50, 60, 70, 80];
    let ctx = MemoryCtx::new(&mut pixels, 2);
    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load8888, Context::Memory(&ctx)).unwrap();
    p.push(Stage::SwapRb).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
    p.compile().run(0, 0, 2, 1).unwrap();

    assert_eq!(pixels, [30, 20, 10, 40, 70, 60, 50, 80]);
}

#[test]
fn swap_rb_with_and_without_tail() {
    for &width in &[3, 4, 5, 8, 9] {
        for &isa in &[Isa::Portable, Isa::Avx] {
            let original: Vec<u8> = (0..width * 4 * 4).map(|i| (i * 11 % 256) as u8).collect();
            let mut pixels = original.clone();
            {
                let ctx = MemoryCtx::new(&mut pixels, width);
                let mut p = RasterPipelineBuilder::new();
                p.set_force_hq_pipeline(true);
                p.set_isa(isa);
                p.push_with_context(Stage::Load8888, Context::Memory(&ctx)).unwrap();
                p.push(Stage::SwapRb).unwrap();
                p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
                p.compile().run(0, 0, width, 4).unwrap();
            }

            for (a, b) in pixels.chunks(4).zip(original.chunks(4)) {
                assert_eq!(a, &[b[2], b[1], b[0], b[3]], "{} {:?}", width, isa);
            }
        }
    }
}

#[test]
fn transparent_source_over_keeps_destination() {
    for &force_hq in &[false, true] {
        let mut pixels = test_pixels();
        {
            let ctx = MemoryCtx::new(&mut pixels, WIDTH);
            let mut p = RasterPipelineBuilder::new();
            p.set_force_hq_pipeline(force_hq);
            p.push_uniform_color(Color::TRANSPARENT.premultiply()).unwrap();
            p.push_with_context(Stage::SourceOverRgba8888, Context::Memory(&ctx)).unwrap();
            p.compile().run(0, 0, WIDTH, HEIGHT).unwrap();
        }

        assert_eq!(pixels, test_pixels());
    }
}

#[test]
fn byte_color_is_stored_exactly() {
    let colors = [(155, 99, 53, 180), (1, 2, 3, 4), (255, 0, 128, 255), (0, 0, 0, 0)];
    for &force_hq in &[false, true] {
        for &(r, g, b, a) in &colors {
            let mut pixels = test_pixels();
            {
                let ctx = MemoryCtx::new(&mut pixels, WIDTH);
                let mut p = RasterPipelineBuilder::new();
                p.set_force_hq_pipeline(force_hq);
                p.push_uniform_color_u8(PremultipliedColorU8::from_rgba(r, g, b, a).unwrap()).unwrap();
                p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
                p.compile().run(0, 0, WIDTH, HEIGHT).unwrap();
            }

            for px in pixels.chunks(4) {
                assert_eq!(px, &[r, g, b, a]);
            }
        }
    }
}

#[test_log::test]
fn read_only_store_is_rejected() {
    let pixels = [1u8; 16];
    let ctx = MemoryCtx::new_read_only(&pixels, 4);
    let mut p = RasterPipelineBuilder::new();
    p.push(Stage::WhiteColor).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
    assert_eq!(
        p.compile().run(0, 0, 4, 1),
        Err(PipelineError::ReadOnlyBuffer(Stage::Store8888))
    );
    assert_eq!(pixels, [1u8; 16]);
}

#[test_log::test]
fn small_buffer_is_rejected() {
    let mut pixels = [0u8; 4 * 7];
    let ctx = MemoryCtx::new(&mut pixels, 4);
    let mut p = RasterPipelineBuilder::new();
    p.push(Stage::WhiteColor).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
    assert_eq!(
        p.compile().run(0, 0, 4, 2),
        Err(PipelineError::BufferTooSmall { stage: Stage::Store8888, required: 32, available: 28 })
    );
    assert!(pixels.iter().all(|v| *v == 0));
}

#[test_log::test]
fn invalid_region() {
    let mut p = RasterPipelineBuilder::new();
    p.push(Stage::WhiteColor).unwrap();
    let p = p.compile();
    assert_eq!(p.run(4, 0, 2, 1), Err(PipelineError::InvalidRegion));
    assert_eq!(p.run(2, 0, 2, 1), Ok(()));
}

#[test]
fn region_at_the_end_of_address_space() {
    // No memory stage bounds the region, so only the chunk loop has to avoid overflowing.
    for &force_hq in &[false, true] {
        let mut p = RasterPipelineBuilder::new();
        p.set_force_hq_pipeline(force_hq);
        p.push(Stage::WhiteColor).unwrap();
        assert_eq!(p.compile().run(usize::MAX - 3, 0, usize::MAX, 1), Ok(()));
    }
}

#[test]
fn empty_pipeline_is_a_noop() {
    let p = RasterPipelineBuilder::new().compile();
    assert!(p.is_lowp());
    assert_eq!(p.run(0, 0, 100, 100), Ok(()));
}

#[test]
fn shared_context_for_load_and_store() {
    // A 3x2 region inside of a 4x3 buffer.
    let mut pixels = [0u8; 4 * 3 * 4];
    let ctx = MemoryCtx::new(&mut pixels, 4);
    let white = UniformColorCtx::new(Color::WHITE.premultiply());

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::UniformColor, Context::UniformColor(&white)).unwrap();
    p.push_with_context(Stage::Load8888Dst, Context::Memory(&ctx)).unwrap();
    p.push_with_context(Stage::Lerp1Float, Context::Value(0.5)).unwrap();
    p.push_with_context(Stage::Store8888, Context::Memory(&ctx)).unwrap();
    p.compile().run(1, 1, 4, 3).unwrap();

    for y in 0..3 {
        for x in 0..4 {
            let i = (y * 4 + x) * 4;
            let expected = if x >= 1 && y >= 1 { 128 } else { 0 };
            assert_eq!(pixels[i], expected, "{}x{}", x, y);
        }
    }
}
