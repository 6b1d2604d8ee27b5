use tiny_skia_pipeline::*;

// Every byte value in every channel.
fn all_bytes() -> Vec<u8> {
    (0..=255).collect()
}

fn apply(stages: &[(Stage, Context)], src: &[u8], force_hq: bool) -> (Vec<u8>, bool) {
    let width = src.len() / 4;
    let mut dst = vec![0; src.len()];
    let is_lowp;
    {
        let src_ctx = MemoryCtx::new_read_only(src, width);
        let dst_ctx = MemoryCtx::new(&mut dst, width);

        let mut p = RasterPipelineBuilder::new();
        p.set_force_hq_pipeline(force_hq);
        p.push_with_context(Stage::Load8888, Context::Memory(&src_ctx)).unwrap();
        for (stage, ctx) in stages {
            p.push_with_context(*stage, *ctx).unwrap();
        }
        p.push_with_context(Stage::Store8888, Context::Memory(&dst_ctx)).unwrap();
        let p = p.compile();
        is_lowp = p.is_lowp();
        p.run(0, 0, width, 1).unwrap();
    }

    (dst, is_lowp)
}

fn assert_close(a: &[u8], b: &[u8], tolerance: i32) {
    assert_eq!(a.len(), b.len());
    for (i, (a, b)) in a.iter().zip(b.iter()).enumerate() {
        assert!((i32::from(*a) - i32::from(*b)).abs() <= tolerance, "{}: {} vs {}", i, a, b);
    }
}

#[test]
fn srgb_round_trip() {
    let src = all_bytes();
    let (dst, is_lowp) = apply(
        &[(Stage::FromSrgb, Context::None), (Stage::ToSrgb, Context::None)],
        &src,
        false,
    );
    assert!(!is_lowp);
    assert_close(&dst, &src, 1);
}

#[test]
fn from_srgb_darkens_midtones() {
    // sRGB 50% gray is about 21% linear.
    let src = [128, 128, 128, 255];
    let (dst, _) = apply(&[(Stage::FromSrgb, Context::None)], &src, false);
    assert_close(&dst, &[55, 55, 55, 255], 1);
}

#[test]
fn linear_transfer_function_is_identity() {
    let tf = TransferFunction { g: 1.0, a: 1.0, b: 0.0, c: 1.0, d: 1.0, e: 0.0, f: 0.0 };
    let src = all_bytes();
    let stages = [
        (Stage::ParametricR, Context::TransferFunction(&tf)),
        (Stage::ParametricG, Context::TransferFunction(&tf)),
        (Stage::ParametricB, Context::TransferFunction(&tf)),
        (Stage::ParametricA, Context::TransferFunction(&tf)),
    ];
    let (dst, _) = apply(&stages, &src, false);
    assert_eq!(dst, src);
}

#[test]
fn gamma_matches_powf() {
    let src = all_bytes();
    let (dst, _) = apply(&[(Stage::Gamma, Context::Value(2.2))], &src, false);

    let expected: Vec<u8> = src
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if i % 4 == 3 {
                *v
            } else {
                ((f32::from(*v) / 255.0).powf(2.2) * 255.0 + 0.5) as u8
            }
        })
        .collect();
    assert_close(&dst, &expected, 1);
}

#[test]
fn parametric_curve_matches_powf() {
    let tf = TransferFunction { g: 2.4, a: 1.0 / 1.055, b: 0.055 / 1.055, c: 1.0 / 12.92, d: 0.04045, e: 0.0, f: 0.0 };
    let src = all_bytes();
    let (dst, _) = apply(&[(Stage::ParametricR, Context::TransferFunction(&tf))], &src, false);

    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let v = f32::from(*s) / 255.0;
        let expected = if i % 4 != 0 {
            v
        } else if v <= tf.d {
            tf.c * v + tf.f
        } else {
            (tf.a * v + tf.b).powf(tf.g) + tf.e
        };

        let expected = (expected * 255.0 + 0.5) as i32;
        assert!((i32::from(*d) - expected).abs() <= 1, "{}: {} vs {}", i, d, expected);
    }
}

#[test]
fn byte_tables_remap_every_channel() {
    let mut tables = ByteTablesCtx::identity();
    for (i, v) in tables.r.iter_mut().enumerate() {
        *v = 255 - i as u8;
    }
    for (i, v) in tables.a.iter_mut().enumerate() {
        *v = (i / 2) as u8;
    }

    let src = all_bytes();
    let (dst, _) = apply(&[(Stage::ByteTables, Context::ByteTables(&tables))], &src, false);
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let expected = match i % 4 {
            0 => 255 - s,
            3 => s / 2,
            _ => *s,
        };
        assert_eq!(*d, expected, "{}", i);
    }

    // The rgb only variant keeps alpha.
    let (dst, _) = apply(&[(Stage::ByteTablesRgb, Context::ByteTables(&tables))], &src, false);
    for (s, d) in src.chunks(4).zip(dst.chunks(4)) {
        assert_eq!(s[3], d[3]);
    }
}

#[test]
fn two_entry_table_thresholds() {
    let table = [0.0, 1.0];
    let src = all_bytes();
    let (dst, _) = apply(&[(Stage::TableG, Context::Table(&table))], &src, false);
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        if i % 4 == 1 {
            assert_eq!(*d, if *s < 128 { 0 } else { 255 }, "{}", s);
        } else {
            assert_eq!(d, s);
        }
    }
}

#[test]
fn identity_color_lut() {
    // b varies fastest.
    let mut table = Vec::new();
    for r in 0..2 {
        for g in 0..2 {
            for b in 0..2 {
                table.extend_from_slice(&[r as f32, g as f32, b as f32]);
            }
        }
    }

    let lut = ColorLutCtx::new(&table, [2, 2, 2, 1]).unwrap();
    let src = all_bytes();
    let (dst, _) = apply(&[(Stage::Clut3D, Context::ColorLut(&lut))], &src, false);
    assert_close(&dst, &src, 1);
}

#[test]
fn hsl_round_trip() {
    let src: Vec<u8> = all_bytes()
        .chunks(4)
        .flat_map(|px| vec![px[0], px[1], px[2], 255])
        .collect();
    let (dst, _) = apply(
        &[(Stage::RgbToHsl, Context::None), (Stage::HslToRgb, Context::None)],
        &src,
        false,
    );
    assert_close(&dst, &src, 1);
}

#[test]
fn luminance_to_alpha() {
    let src = [255, 255, 255, 255, 0, 0, 0, 255, 255, 0, 0, 255, 0, 255, 0, 255];
    for &force_hq in &[false, true] {
        let (dst, is_lowp) = apply(&[(Stage::LuminanceToAlpha, Context::None)], &src, force_hq);
        assert_eq!(is_lowp, !force_hq);

        let alphas: Vec<u8> = dst.chunks(4).map(|px| px[3]).collect();
        assert_eq!(&alphas[..2], &[255, 0]);
        // Green is much brighter than red.
        assert_close(&alphas[2..], &[54, 182], 1);
        assert!(dst.chunks(4).all(|px| px[..3] == [0, 0, 0]));
    }
}

#[test]
fn premultiply_and_back() {
    let src: Vec<u8> = all_bytes()
        .chunks(4)
        .flat_map(|px| vec![px[0], px[1], px[2], 255])
        .collect();
    let (dst, _) = apply(
        &[(Stage::Premultiply, Context::None), (Stage::Unpremultiply, Context::None)],
        &src,
        false,
    );
    assert_eq!(dst, src);
}
