//! Cut-based photon identification.
//!
//! Two regions over the same shower-shape and isolation variables:
//! the tight *selected* region for prompt isolated photons and a loose
//! *fake* sideband. A photon is fake only if it sits inside the loose
//! window **and** fails the tight region, so the two never overlap no matter
//! how the thresholds are tuned.

use mp_core::{Photon, PhotonClass};

use crate::config::{PhotonIdConfig, RegionCuts};

/// Classifies photons against configured selected/fake regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonClassifier {
    selected: RegionCuts,
    fake: RegionCuts,
}

impl PhotonClassifier {
    /// Classifier over validated region cuts.
    pub fn new(cfg: &PhotonIdConfig) -> Self {
        Self { selected: cfg.selected, fake: cfg.fake }
    }

    /// Category of `photon`.
    pub fn classify(&self, photon: &Photon) -> PhotonClass {
        if self.in_selected_region(photon) {
            PhotonClass::Selected
        } else if passes_region(&self.fake, photon) {
            PhotonClass::Fake
        } else {
            PhotonClass::Rejected
        }
    }

    /// Inside the tight region.
    pub fn in_selected_region(&self, photon: &Photon) -> bool {
        passes_region(&self.selected, photon)
    }

    /// Inside the loose window and outside the tight region.
    pub fn in_fake_region(&self, photon: &Photon) -> bool {
        !self.in_selected_region(photon) && passes_region(&self.fake, photon)
    }

    /// First selected photon in collection order, else the first fake one.
    pub fn choose(&self, photons: &[Photon]) -> Option<(usize, PhotonClass)> {
        let mut first_fake = None;
        for (i, ph) in photons.iter().enumerate() {
            match self.classify(ph) {
                PhotonClass::Selected => return Some((i, PhotonClass::Selected)),
                PhotonClass::Fake if first_fake.is_none() => first_fake = Some(i),
                _ => {}
            }
        }
        first_fake.map(|i| (i, PhotonClass::Fake))
    }
}

fn passes_region(cuts: &RegionCuts, ph: &Photon) -> bool {
    // NaN fails every comparison, so it never lands in a region.
    cuts.min_r9.is_none_or(|min| ph.r9 > min)
        && ph.hover_e < cuts.max_hover_e
        && ph.cov_ieta_ieta < cuts.max_cov_ieta_ieta
        && ph.iso1 < cuts.iso1.bound(ph.et)
        && ph.iso2 < cuts.iso2.bound(ph.et)
        && ph.iso3 < cuts.iso3.bound(ph.et)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IsoCut;
    use proptest::prelude::*;

    fn classifier() -> PhotonClassifier {
        PhotonClassifier::new(&PhotonIdConfig {
            selected: RegionCuts {
                max_hover_e: 0.05,
                max_cov_ieta_ieta: 0.011,
                min_r9: None,
                iso1: IsoCut { constant: 1.5, et_slope: 0.0 },
                iso2: IsoCut { constant: 1.0, et_slope: 0.04 },
                iso3: IsoCut { constant: 0.7, et_slope: 0.005 },
            },
            fake: RegionCuts {
                max_hover_e: 0.05,
                max_cov_ieta_ieta: 0.014,
                min_r9: None,
                iso1: IsoCut { constant: 15.0, et_slope: 0.0 },
                iso2: IsoCut { constant: 10.0, et_slope: 0.0 },
                iso3: IsoCut { constant: 10.0, et_slope: 0.0 },
            },
        })
    }

    fn photon(hover_e: f64, sieie: f64, iso: f64) -> Photon {
        Photon {
            et: 100.0,
            eta: 0.5,
            phi: 0.0,
            r9: 0.95,
            hover_e,
            cov_ieta_ieta: sieie,
            iso1: iso,
            iso2: iso,
            iso3: iso,
        }
    }

    #[test]
    fn tight_isolated_photon_is_selected() {
        assert_eq!(classifier().classify(&photon(0.01, 0.009, 0.1)), PhotonClass::Selected);
    }

    #[test]
    fn non_isolated_photon_in_window_is_fake() {
        let c = classifier();
        let ph = photon(0.01, 0.009, 5.0);
        assert_eq!(c.classify(&ph), PhotonClass::Fake);
        assert!(c.in_fake_region(&ph));
        assert!(!c.in_selected_region(&ph));
    }

    #[test]
    fn outside_both_regions_is_rejected() {
        let c = classifier();
        assert_eq!(c.classify(&photon(0.2, 0.009, 0.1)), PhotonClass::Rejected);
        assert_eq!(c.classify(&photon(0.01, 0.009, 50.0)), PhotonClass::Rejected);
        assert_eq!(c.classify(&photon(f64::NAN, 0.009, 0.1)), PhotonClass::Rejected);
    }

    #[test]
    fn isolation_bound_scales_with_et() {
        let c = classifier();
        // iso3 bound: 0.7 + 0.005 * et
        let mut ph = photon(0.01, 0.009, 0.9);
        ph.iso1 = 0.1;
        ph.iso2 = 0.1;
        ph.et = 20.0;
        assert_eq!(c.classify(&ph), PhotonClass::Fake);
        ph.et = 100.0;
        assert_eq!(c.classify(&ph), PhotonClass::Selected);
    }

    #[test]
    fn min_r9_applies_when_configured() {
        let mut cfg = PhotonIdConfig { selected: classifier().selected, fake: classifier().fake };
        cfg.selected.min_r9 = Some(0.9);
        let c = PhotonClassifier::new(&cfg);
        let mut ph = photon(0.01, 0.009, 0.1);
        ph.r9 = 0.5;
        assert_eq!(c.classify(&ph), PhotonClass::Fake);
    }

    #[test]
    fn choose_prefers_selected_over_earlier_fake() {
        let c = classifier();
        let photons =
            [photon(0.2, 0.009, 0.1), photon(0.01, 0.009, 5.0), photon(0.01, 0.009, 0.1)];
        assert_eq!(c.choose(&photons), Some((2, PhotonClass::Selected)));
    }

    #[test]
    fn choose_falls_back_to_first_fake() {
        let c = classifier();
        let photons =
            [photon(0.2, 0.009, 0.1), photon(0.01, 0.009, 5.0), photon(0.01, 0.012, 5.0)];
        assert_eq!(c.choose(&photons), Some((1, PhotonClass::Fake)));
        assert_eq!(c.choose(&[photon(0.2, 0.2, 0.1)]), None);
        assert_eq!(c.choose(&[]), None);
    }

    #[test]
    fn photon_without_id_variables_is_never_a_candidate() {
        let ph: Photon = serde_json::from_str(r#"{"et": 80.0, "eta": 0.2, "phi": 1.0}"#).unwrap();
        let c = classifier();
        assert!(!c.in_selected_region(&ph));
        assert!(!c.in_fake_region(&ph));
        assert_eq!(c.classify(&ph), PhotonClass::Rejected);
        assert_eq!(c.choose(&[ph]), None);
    }

    proptest! {
        #[test]
        fn prop_regions_are_disjoint(
            et in 0.0f64..500.0,
            r9 in 0.0f64..1.2,
            hover_e in 0.0f64..0.2,
            sieie in 0.0f64..0.03,
            iso1 in 0.0f64..30.0,
            iso2 in 0.0f64..30.0,
            iso3 in 0.0f64..30.0,
        ) {
            let c = classifier();
            let ph = Photon {
                et,
                eta: 0.0,
                phi: 0.0,
                r9,
                hover_e,
                cov_ieta_ieta: sieie,
                iso1,
                iso2,
                iso3,
            };
            prop_assert!(!(c.in_selected_region(&ph) && c.in_fake_region(&ph)));
            let class = c.classify(&ph);
            prop_assert_eq!(class == PhotonClass::Selected, c.in_selected_region(&ph));
            prop_assert_eq!(class == PhotonClass::Fake, c.in_fake_region(&ph));
        }
    }
}
