//! Premultiplied RGBA8 blend kernels.
//!
//! Everything here operates on interleaved premultiplied buffers whose
//! length is `width * height * 4`. Layer styles are applied in two steps:
//! wipe masks scale pixels in place first, then layers combine through the
//! `over`/weighted-add kernels.

use rayon::prelude::*;

use crate::foundation::math::{mul_div255_u8, smoothstep};
use crate::foundation::{CutError, CutResult};
use crate::transition::{SlideDir, WipeMask};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over with an extra source opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Source-over an entire layer onto `dst`.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> CutResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CutError::evaluation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    if opacity <= 0.0 {
        return Ok(());
    }
    dst.par_chunks_exact_mut(4)
        .zip(src.par_chunks_exact(4))
        .for_each(|(d, s)| {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
            d.copy_from_slice(&out);
        });
    Ok(())
}

/// Weighted sum of two layers composited over `dst`.
///
/// `out = over(dst, sat(a*wa + b*wb))`. With complementary weights this is a
/// crossfade; transition blends in general feed their per-layer opacities in
/// here so the weights need not sum to one.
pub fn weighted_add_over_in_place(
    dst: &mut [u8],
    a: &[u8],
    b: &[u8],
    wa: f32,
    wb: f32,
) -> CutResult<()> {
    if dst.len() != a.len() || dst.len() != b.len() || !dst.len().is_multiple_of(4) {
        return Err(CutError::evaluation(
            "weighted_add_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    let wa = ((wa.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    let wb = ((wb.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;

    dst.par_chunks_exact_mut(4)
        .zip(a.par_chunks_exact(4).zip(b.par_chunks_exact(4)))
        .for_each(|(d, (a, b))| {
            let mut blended = [0u8; 4];
            for i in 0..4 {
                let av = mul_div255_u8(u16::from(a[i]), wa);
                let bv = mul_div255_u8(u16::from(b[i]), wb);
                blended[i] = av.saturating_add(bv);
            }
            let out = over([d[0], d[1], d[2], d[3]], blended, 1.0);
            d.copy_from_slice(&out);
        });
    Ok(())
}

/// Scale a layer in place by a directional wipe mask.
///
/// Pixels in the revealed region keep their value, pixels past the moving
/// edge go transparent, and a soft edge smoothsteps between them. The edge
/// travels along the mask's direction axis; coverage 1 reveals everything.
pub fn apply_wipe_mask(buf: &mut [u8], width: u32, height: u32, mask: WipeMask) -> CutResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CutError::evaluation("wipe buffer size overflow"))?;
    if buf.len() != expected {
        return Err(CutError::evaluation(
            "apply_wipe_mask expects a buffer matching width*height*4",
        ));
    }

    let coverage = mask.coverage.clamp(0.0, 1.0);
    let soft = mask.soft_edge.max(0.0);
    let axis_len = match mask.dir {
        SlideDir::Left | SlideDir::Right => width as f32,
        SlideDir::Up | SlideDir::Down => height as f32,
    };
    let soft_px = soft * axis_len;
    let edge = coverage * (axis_len + 2.0 * soft_px) - soft_px;
    let lo = edge - soft_px;
    let hi = edge + soft_px;

    buf.par_chunks_exact_mut((width as usize) * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let pos = match mask.dir {
                    SlideDir::Left => (width as usize - 1 - x) as f32,
                    SlideDir::Right => x as f32,
                    SlideDir::Up => (height - 1) as f32 - y as f32,
                    SlideDir::Down => y as f32,
                };
                let m = if soft_px <= 0.0 {
                    if pos < edge { 1.0 } else { 0.0 }
                } else {
                    1.0 - smoothstep(lo, hi, pos)
                };
                if m >= 1.0 {
                    continue;
                }
                let m = ((m * 255.0).round() as i32).clamp(0, 255) as u16;
                for c in px.iter_mut() {
                    *c = mul_div255_u8(u16::from(*c), m);
                }
            }
        });
    Ok(())
}

/// Separable gaussian blur over a premultiplied layer.
///
/// Weights are fixed-point q16 so the two passes stay integer-only. Edge
/// pixels clamp (no transparent halo at the canvas border).
pub fn blur_in_place(buf: &mut [u8], width: u32, height: u32, radius_px: f32) -> CutResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CutError::evaluation("blur buffer size overflow"))?;
    if buf.len() != expected {
        return Err(CutError::evaluation(
            "blur_in_place expects a buffer matching width*height*4",
        ));
    }
    let radius = radius_px.max(0.0).round() as u32;
    if radius == 0 || width == 0 || height == 0 {
        return Ok(());
    }

    let kernel = gaussian_kernel_q16(radius, radius_px.max(0.5) / 2.0);
    let mut tmp = vec![0u8; expected];
    blur_horizontal(buf, &mut tmp, width, &kernel);
    blur_vertical(&tmp, buf, width, height, &kernel);
    Ok(())
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| (-(f64::from(i) * f64::from(i)) / denom).exp())
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|&w| (((w / sum) * 65536.0).round() as i64).clamp(0, 65536) as u32)
        .collect();
    // Re-balance rounding drift onto the center tap so the taps sum to one.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + (65536 - acc)).clamp(0, 65536) as u32;
    weights
}

fn blur_horizontal(src: &[u8], dst: &mut [u8], width: u32, kernel: &[u32]) {
    let radius = (kernel.len() / 2) as i32;
    let w = width as i32;
    dst.par_chunks_exact_mut((width as usize) * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src[y * (width as usize) * 4..(y + 1) * (width as usize) * 4];
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in kernel.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1) as usize * 4;
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += u64::from(kw) * u64::from(src_row[sx + c]);
                    }
                }
                let out = x as usize * 4;
                for (c, &a) in acc.iter().enumerate() {
                    row[out + c] = q16_to_u8(a);
                }
            }
        });
}

fn blur_vertical(src: &[u8], dst: &mut [u8], width: u32, height: u32, kernel: &[u32]) {
    let radius = (kernel.len() / 2) as i32;
    let w = width as usize;
    let h = height as i32;
    dst.par_chunks_exact_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in kernel.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                    let idx = (sy * w + x) * 4;
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for (c, &a) in acc.iter().enumerate() {
                    row[x * 4 + c] = q16_to_u8(a);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// Screen-blend a uniform white flash over an opaque frame.
pub fn apply_flash(buf: &mut [u8], intensity: f32) {
    let i = ((intensity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if i == 0 {
        return;
    }
    buf.par_chunks_exact_mut(4).for_each(|px| {
        for c in px.iter_mut().take(3) {
            let lift = mul_div255_u8(255 - u16::from(*c), i);
            *c = c.saturating_add(lift);
        }
    });
}

/// Multiply deterministic film grain into an opaque frame.
///
/// The grain field is a pure hash of pixel position and `seed`, so the same
/// frame always renders the same bytes.
pub fn apply_film_grain(buf: &mut [u8], width: u32, intensity: f32, seed: u32) {
    let intensity = intensity.clamp(0.0, 1.0);
    if intensity <= 0.0 {
        return;
    }
    buf.par_chunks_exact_mut((width as usize) * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let g = hash_noise(x as u32, y as u32, seed);
                // Darken by up to `intensity` of the grain value.
                let keep = 1.0 - intensity * g;
                let k = ((keep * 255.0).round() as i32).clamp(0, 255) as u16;
                for c in px.iter_mut().take(3) {
                    *c = mul_div255_u8(u16::from(*c), k);
                }
            }
        });
}

/// Cheap integer hash mapped to `[0, 1]`.
fn hash_noise(x: u32, y: u32, seed: u32) -> f32 {
    let mut h = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B) ^ seed;
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    (h & 0xFFFF) as f32 / 65_535.0
}

/// Premultiply straight-alpha RGBA8 bytes in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((u16::from(px[0]) * a + 127) / 255) as u8;
        px[1] = ((u16::from(px[1]) * a + 127) / 255) as u8;
        px[2] = ((u16::from(px[2]) * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [10, 20, 30, 255];
        assert_eq!(over(dst, [200, 200, 200, 255], 0.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let out = over([10, 20, 30, 255], [200, 100, 50, 255], 1.0);
        assert_eq!(out, [200, 100, 50, 255]);
    }

    #[test]
    fn over_dst_transparent_returns_scaled_src() {
        let out = over([0, 0, 0, 0], [100, 100, 100, 255], 0.5);
        assert_eq!(out[3], 128);
        assert!(out[0] >= 49 && out[0] <= 51);
    }

    #[test]
    fn weighted_add_endpoints_match_inputs() {
        let a = vec![200u8, 0, 0, 255];
        let b = vec![0u8, 200, 0, 255];
        let mut dst = vec![0u8; 4];
        weighted_add_over_in_place(&mut dst, &a, &b, 1.0, 0.0).unwrap();
        assert_eq!(dst, a);
        let mut dst = vec![0u8; 4];
        weighted_add_over_in_place(&mut dst, &a, &b, 0.0, 1.0).unwrap();
        assert_eq!(dst, b);
    }

    #[test]
    fn wipe_full_coverage_is_noop_and_zero_coverage_clears() {
        let src = vec![100u8; 4 * 4 * 4];
        let mask = |coverage| WipeMask {
            dir: SlideDir::Right,
            coverage,
            soft_edge: 0.0,
        };

        let mut full = src.clone();
        apply_wipe_mask(&mut full, 4, 4, mask(1.0)).unwrap();
        assert_eq!(full, src);

        let mut none = src.clone();
        apply_wipe_mask(&mut none, 4, 4, mask(0.0)).unwrap();
        assert_eq!(none, vec![0u8; 4 * 4 * 4]);
    }

    #[test]
    fn wipe_midpoint_splits_hard_edge() {
        let mut buf = vec![100u8; 4 * 1 * 4];
        apply_wipe_mask(
            &mut buf,
            4,
            1,
            WipeMask {
                dir: SlideDir::Right,
                coverage: 0.5,
                soft_edge: 0.0,
            },
        )
        .unwrap();
        // Left half revealed, right half cleared.
        assert_eq!(&buf[0..8], &[100u8; 8]);
        assert_eq!(&buf[8..16], &[0u8; 8]);
    }

    #[test]
    fn flash_full_intensity_is_white() {
        let mut buf = vec![10u8, 20, 30, 255];
        apply_flash(&mut buf, 1.0);
        assert_eq!(buf, vec![255, 255, 255, 255]);
    }

    #[test]
    fn film_grain_is_deterministic_and_darkens() {
        let src = vec![200u8; 8 * 2 * 4];
        let mut a = src.clone();
        let mut b = src.clone();
        apply_film_grain(&mut a, 8, 0.5, 7);
        apply_film_grain(&mut b, 8, 0.5, 7);
        assert_eq!(a, b);
        assert!(a.chunks_exact(4).all(|px| px[0] <= 200));
        assert!(a != src);
    }

    #[test]
    fn blur_zero_radius_is_identity() {
        let src: Vec<u8> = (0..2u8 * 2 * 4).collect();
        let mut buf = src.clone();
        blur_in_place(&mut buf, 2, 2, 0.0).unwrap();
        assert_eq!(buf, src);
    }

    #[test]
    fn blur_preserves_constant_regions_and_softens_edges() {
        let (w, h) = (8u32, 1u32);
        let mut buf = vec![0u8; (w * h * 4) as usize];
        // Left half opaque white, right half transparent.
        for px in buf.chunks_exact_mut(4).take(4) {
            px.copy_from_slice(&[255, 255, 255, 255]);
        }
        blur_in_place(&mut buf, w, h, 2.0).unwrap();
        // Far ends stay saturated thanks to edge clamping.
        assert_eq!(buf[3], 255);
        assert_eq!(buf[(7 * 4 + 3) as usize], 0);
        // The boundary pixel picked up weight from both sides.
        let mid_alpha = buf[(4 * 4 + 3) as usize];
        assert!(mid_alpha > 0 && mid_alpha < 255);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut dst = vec![0u8; 8];
        assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
        assert!(apply_wipe_mask(
            &mut dst,
            4,
            4,
            WipeMask {
                dir: SlideDir::Left,
                coverage: 0.5,
                soft_edge: 0.0
            }
        )
        .is_err());
    }
}
