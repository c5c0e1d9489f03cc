use crate::payload::Quat;

/// Smallest-three quaternion compression: drop the largest-magnitude component (after
/// flipping the sign of the whole quaternion if that component was negative, since
/// `q` and `-q` represent the same rotation), then quantize the remaining three. See
/// spec.md 3 "the wire format transmits a compressed ... quaternion using the
/// smallest-three encoding with sign reconstruction of the largest component."
///
/// spec.md calls this a "32-bit compressed quaternion" but also requires (8 #8) a
/// round trip within 1e-3 radians; a 2+3x10-bit packing (the naive reading of "32-bit")
/// only guarantees ~4e-3 rad worst case. We use 2+3x13 bits (41 bits, packed into a
/// `u64`) instead — see DESIGN.md for this Open Question resolution.
const COMPONENT_BITS: u32 = 13;
const COMPONENT_RANGE: f32 = std::f32::consts::FRAC_1_SQRT_2;

fn quant_max() -> u32 {
    (1u32 << COMPONENT_BITS) - 1
}

pub fn compress_quat(q: &Quat) -> u64 {
    let c = q.normalize().0;

    let mut max_idx = 0usize;
    let mut max_abs = c[0].abs();
    for (i, value) in c.iter().enumerate().skip(1) {
        if value.abs() > max_abs {
            max_abs = value.abs();
            max_idx = i;
        }
    }

    let sign = if c[max_idx] < 0.0 { -1.0 } else { 1.0 };

    let mut others = [0f32; 3];
    let mut out_idx = 0;
    for (i, value) in c.iter().enumerate() {
        if i != max_idx {
            others[out_idx] = value * sign;
            out_idx += 1;
        }
    }

    let max_q = quant_max();
    let mut packed: u64 = (max_idx as u64) << (COMPONENT_BITS * 3);
    for (i, value) in others.iter().enumerate() {
        let normalized = (value / COMPONENT_RANGE).clamp(-1.0, 1.0);
        let quant = (((normalized + 1.0) * 0.5) * max_q as f32).round() as u64;
        packed |= quant << (COMPONENT_BITS * (2 - i as u32));
    }
    packed
}

pub fn decompress_quat(packed: u64) -> Quat {
    let max_idx = (packed >> (COMPONENT_BITS * 3)) as usize;
    let max_q = quant_max();
    let mask = max_q as u64;

    let mut others = [0f32; 3];
    for (i, slot) in others.iter_mut().enumerate() {
        let quant = (packed >> (COMPONENT_BITS * (2 - i as u32))) & mask;
        let normalized = (quant as f32 / max_q as f32) * 2.0 - 1.0;
        *slot = normalized * COMPONENT_RANGE;
    }

    let sum_sq: f32 = others.iter().map(|v| v * v).sum();
    let dropped = (1.0 - sum_sq).max(0.0).sqrt();

    let mut comps = [0f32; 4];
    let mut in_idx = 0;
    for (i, slot) in comps.iter_mut().enumerate() {
        if i == max_idx {
            *slot = dropped;
        } else {
            *slot = others[in_idx];
            in_idx += 1;
        }
    }
    Quat(comps).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_between(a: &Quat, b: &Quat) -> f32 {
        let dot = a.dot(b).clamp(-1.0, 1.0).abs();
        2.0 * dot.acos()
    }

    #[test]
    fn round_trips_identity() {
        let packed = compress_quat(&Quat::IDENTITY);
        let decoded = decompress_quat(packed);
        assert!(angle_between(&Quat::IDENTITY, &decoded) < 1e-3);
    }

    #[test]
    fn round_trips_within_one_milliradian_tolerance() {
        // spec.md 8 #8
        let samples = [
            Quat([0.0, 0.0, 0.70710677, 0.70710677]),
            Quat([0.18257419, 0.36514837, 0.54772256, 0.73029674]).normalize(),
            Quat([-0.5, 0.5, -0.5, 0.5]),
            Quat([0.0, 1.0, 0.0, 0.0]),
        ];
        for sample in samples {
            let packed = compress_quat(&sample);
            let decoded = decompress_quat(packed);
            let err = angle_between(&sample, &decoded);
            assert!(err < 1e-3, "angle error {err} too large for {sample:?}");
        }
    }
}
