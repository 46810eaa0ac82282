//! Forward signal models.
//!
//! Closed-form signal equations used to synthesise data with known ground
//! truth. B-values are in s/mm², times in ms, angles in degrees.

/// Mono-exponential diffusion: `S0 * exp(-ADC * b)`.
pub fn adc_signal(b: f64, s0: f64, adc: f64) -> f64 {
    s0 * (-adc * b).exp()
}

/// Bi-exponential IVIM: `S0 * ((1 - f) exp(-D b) + f exp(-D* b))`.
pub fn ivim_signal(b: f64, s0: f64, d: f64, f: f64, dstar: f64) -> f64 {
    s0 * ((1.0 - f) * (-d * b).exp() + f * (-dstar * b).exp())
}

/// Spoiled gradient-echo signal for variable flip angle T1 mapping.
///
/// `b1` scales the nominal flip angle.
pub fn vfa_signal(fa_deg: f64, t1: f64, m0: f64, tr: f64, b1: f64) -> f64 {
    let alpha = (fa_deg * b1).to_radians();
    let e1 = (-tr / t1).exp();
    m0 * alpha.sin() * (1.0 - e1) / (1.0 - alpha.cos() * e1)
}

/// Magnitude inversion-recovery signal: `|M0 (1 - 2 exp(-TI / T1))|`.
pub fn ir_signal(ti: f64, t1: f64, m0: f64) -> f64 {
    (m0 * (1.0 - 2.0 * (-ti / t1).exp())).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffusion_models_start_at_s0() {
        assert!((adc_signal(0.0, 100.0, 1e-3) - 100.0).abs() < 1e-12);
        assert!((ivim_signal(0.0, 100.0, 1e-3, 0.2, 15e-3) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn ivim_without_perfusion_is_adc() {
        for b in [0.0, 100.0, 800.0] {
            let a = adc_signal(b, 50.0, 0.8e-3);
            let i = ivim_signal(b, 50.0, 0.8e-3, 0.0, 15e-3);
            assert!((a - i).abs() < 1e-12);
        }
    }

    #[test]
    fn vfa_signal_peaks_near_ernst_angle() {
        let (t1, tr): (f64, f64) = (1000.0, 4.0);
        let ernst = (-tr / t1).exp().acos().to_degrees();
        let at_ernst = vfa_signal(ernst, t1, 1.0, tr, 1.0);
        assert!(at_ernst > vfa_signal(ernst * 0.5, t1, 1.0, tr, 1.0));
        assert!(at_ernst > vfa_signal(ernst * 2.0, t1, 1.0, tr, 1.0));
    }

    #[test]
    fn ir_signal_nulls_at_t1_ln2() {
        let t1 = 1200.0;
        let null = t1 * std::f64::consts::LN_2;
        assert!(ir_signal(null, t1, 1000.0) < 1e-9);
        assert!((ir_signal(1e9, t1, 1000.0) - 1000.0).abs() < 1e-6);
    }
}
