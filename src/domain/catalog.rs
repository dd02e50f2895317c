//! Legal values for every choice field of the patient form.
//!
//! Static data for a UI layer populating dropdowns; flags are listed as
//! booleans and shown as Yes / No.

use serde::Serialize;

use super::patient::{ChestPain, RestingEcg, Sex, StSlope, Thalassemia};

/// A yes/no choice as offered in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagOption {
    pub value: bool,
    pub display: &'static str,
}

const FLAG_OPTIONS: [FlagOption; 2] = [
    FlagOption {
        value: true,
        display: "Yes",
    },
    FlagOption {
        value: false,
        display: "No",
    },
];

/// Options per choice field, keyed as in the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormOptions {
    pub sex: Vec<&'static str>,
    pub cp: Vec<&'static str>,
    pub fbs: [FlagOption; 2],
    pub restecg: Vec<&'static str>,
    pub exang: [FlagOption; 2],
    pub slope: Vec<&'static str>,
    pub thal: Vec<&'static str>,
}

/// The form-options catalog.
#[must_use]
pub fn form_options() -> FormOptions {
    FormOptions {
        sex: Sex::labels(),
        cp: ChestPain::labels(),
        fbs: FLAG_OPTIONS,
        restecg: RestingEcg::labels(),
        exang: FLAG_OPTIONS,
        slope: StSlope::labels(),
        thal: Thalassemia::labels(),
    }
}
