//! Pure rule evaluation — the one function every decision path in the
//! orchestrator funnels through, so the allow-list/deny-list policy is
//! defined exactly once.

use shared::{CountryCode, Mode};
use std::collections::BTreeSet;

/// `S = snapshot.country_codes`, `cc` = the country-code list under
/// consideration (network list, cached location cc, etc):
///
/// - `AllowList`: if `cc` empty → `false`. Else `true` iff `S ⊇ cc`.
/// - `DenyList`: if `S` empty → `true`. Else if `cc` empty → `false`.
///   Else `true` iff `cc ∩ S = ∅`.
pub fn evaluate(mode: Mode, s: &BTreeSet<CountryCode>, cc: &[CountryCode]) -> bool {
    match mode {
        Mode::AllowList => !cc.is_empty() && cc.iter().all(|code| s.contains(code)),
        Mode::DenyList => {
            if s.is_empty() {
                true
            } else if cc.is_empty() {
                false
            } else {
                cc.iter().all(|code| !s.contains(code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &[&str]) -> BTreeSet<CountryCode> {
        raw.iter().map(|c| CountryCode::parse(c).unwrap()).collect()
    }

    fn cc(raw: &[&str]) -> Vec<CountryCode> {
        raw.iter().map(|c| CountryCode::parse(c).unwrap()).collect()
    }

    #[test]
    fn scenario_1_allow_list_hit() {
        let s = codes(&["US", "CA"]);
        assert!(evaluate(Mode::AllowList, &s, &cc(&["US"])));
    }

    #[test]
    fn scenario_2_allow_list_partial_miss() {
        let s = codes(&["US", "CA"]);
        assert!(!evaluate(Mode::AllowList, &s, &cc(&["US", "MX"])));
    }

    #[test]
    fn scenario_3_deny_list_empty_s_empty_cc() {
        let s = codes(&[]);
        assert!(evaluate(Mode::DenyList, &s, &cc(&[])));
    }

    #[test]
    fn allow_list_empty_cc_is_uncertain_and_denies() {
        let s = codes(&["US"]);
        assert!(!evaluate(Mode::AllowList, &s, &cc(&[])));
    }

    #[test]
    fn deny_list_non_empty_s_disjoint_cc_permits() {
        let s = codes(&["RU"]);
        assert!(evaluate(Mode::DenyList, &s, &cc(&["US"])));
    }

    #[test]
    fn deny_list_non_empty_s_overlapping_cc_denies() {
        let s = codes(&["RU", "US"]);
        assert!(!evaluate(Mode::DenyList, &s, &cc(&["US"])));
    }

    #[test]
    fn rule_evaluation_is_idempotent() {
        let s = codes(&["US"]);
        let input = cc(&["US"]);
        let first = evaluate(Mode::AllowList, &s, &input);
        let second = evaluate(Mode::AllowList, &s, &input);
        assert_eq!(first, second);
    }
}
