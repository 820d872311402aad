//! Stereo group: width (side/total energy ratio) and phase correlation.

#[derive(Debug, Clone, Copy)]
pub struct StereoFeatures {
    pub stereo_width: f32,
    pub phase_correlation: f32,
}

pub fn analyze_stereo(left: &[f32], right: &[f32]) -> StereoFeatures {
    if left.is_empty() || right.is_empty() {
        return StereoFeatures { stereo_width: 0.0, phase_correlation: 1.0 };
    }

    let mut mid_energy = 0f64;
    let mut side_energy = 0f64;
    let mut cross = 0f64;
    let mut left_energy = 0f64;
    let mut right_energy = 0f64;

    for (&l, &r) in left.iter().zip(right.iter()) {
        let (l, r) = (l as f64, r as f64);
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5;
        mid_energy += mid * mid;
        side_energy += side * side;
        cross += l * r;
        left_energy += l * l;
        right_energy += r * r;
    }

    let stereo_width = if mid_energy + side_energy > 0.0 {
        (side_energy / (mid_energy + side_energy)) as f32
    } else {
        0.0
    };

    let denom = (left_energy * right_energy).sqrt();
    let phase_correlation = if denom > 1e-12 { (cross / denom) as f32 } else { 1.0 };

    StereoFeatures {
        stereo_width: stereo_width.clamp(0.0, 1.0),
        phase_correlation: phase_correlation.clamp(-1.0, 1.0),
    }
}
