//! Parameter-name catalogue for the models the engine ships with.
//!
//! Order matches the engine's output columns. Unknown model names are not an
//! error: the engine may support models added after this table was written,
//! so callers fall back to generic `p1..pn` names.

use crate::domain::{DwiModel, T1Method};

const DCE_MODELS: &[(&str, &[&str])] = &[
    ("ETM", &["Ktrans", "v_e", "v_p", "tau_a"]),
    ("DIETM", &["Ktrans", "v_e", "v_p", "f_a", "tau_a", "tau_v"]),
    ("DISCM", &["F_p", "k_2", "f_a", "tau_a", "tau_v"]),
    ("2CXM", &["F_p", "PS", "v_e", "v_p", "tau_a"]),
    ("2CFM", &["F_p", "PS", "v_e", "v_p", "tau_a"]),
    ("DI2CXM", &["F_p", "PS", "v_e", "v_p", "f_a", "tau_a", "tau_v"]),
    ("AUEM", &["F_p", "v_ecs", "k_i", "k_ef", "f_a", "tau_a", "tau_v"]),
    ("DIBEM", &["Fpos", "Fneg", "Kpos", "Kneg", "f_a", "tau_a", "tau_v"]),
    ("MLDRW", &["alpha", "kappa", "MTT", "Ktrans", "kep"]),
    ("PATLAK", &["Ktrans", "v_p", "tau_a"]),
];

/// Parameter names of a tracer-kinetic model, if known.
///
/// Lookup is case-insensitive; the engine itself expects capitals.
pub fn dce_param_names(model: &str) -> Option<&'static [&'static str]> {
    DCE_MODELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model))
        .map(|(_, params)| *params)
}

pub fn dwi_param_names(model: DwiModel) -> &'static [&'static str] {
    match model {
        DwiModel::Adc => &["S0", "ADC"],
        DwiModel::Ivim => &["S0", "d", "f", "dstar"],
    }
}

pub fn t1_param_names(method: T1Method) -> &'static [&'static str] {
    match method {
        T1Method::Vfa | T1Method::Ir => &["T1", "M0"],
    }
}

/// All tracer-kinetic model names in the catalogue.
pub fn dce_models() -> impl Iterator<Item = &'static str> {
    DCE_MODELS.iter().map(|(name, _)| *name)
}

/// Column names for a decoded parameter block of width `n`.
///
/// Known names are used while they last; extra columns get `p{i}`.
pub fn column_names(known: Option<&[&str]>, n: usize) -> Vec<String> {
    let known = known.unwrap_or(&[]);
    (0..n)
        .map(|i| match known.get(i) {
            Some(name) => (*name).to_string(),
            None => format!("p{}", i + 1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(dce_param_names("etm").map(|p| p.len()), Some(4));
        assert_eq!(dce_param_names("2cxm").map(|p| p[1]), Some("PS"));
        assert!(dce_param_names("NOT_A_MODEL").is_none());
    }

    #[test]
    fn every_model_has_parameters() {
        assert_eq!(dce_models().count(), 10);
        for model in dce_models() {
            assert!(!dce_param_names(model).unwrap_or(&[]).is_empty(), "{model}");
        }
    }

    #[test]
    fn column_names_fall_back_to_generic() {
        let names = column_names(dce_param_names("PATLAK"), 4);
        assert_eq!(names, vec!["Ktrans", "v_p", "tau_a", "p4"]);
        assert_eq!(column_names(None, 2), vec!["p1", "p2"]);
    }
}
