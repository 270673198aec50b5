//! Property tests: answer expansion is total, deterministic and closed.

use proptest::prelude::*;
use qti_compiler::equivalence::MAX_VARIANTS;
use qti_compiler::expand;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_fraction() -> impl Strategy<Value = String> {
    (1u32..200, 1u32..64).prop_map(|(n, d)| format!("{n}/{d}"))
}

fn arb_decimal() -> impl Strategy<Value = String> {
    (0u32..20, "[0-9]{1,4}").prop_map(|(whole, frac)| match whole {
        0 => format!(".{frac}"),
        w => format!("{w}.{frac}"),
    })
}

fn arb_equation() -> impl Strategy<Value = String> {
    ("[a-z]", 0i32..50, prop_oneof![Just(""), Just(" ")])
        .prop_map(|(var, n, pad)| format!("{var}{pad}={pad}{n}"))
}

fn arb_inequality() -> impl Strategy<Value = String> {
    (
        "[a-z]",
        prop_oneof![Just(">"), Just("<"), Just(">="), Just("<="), Just("≥"), Just("≤")],
        -20i32..20,
    )
        .prop_map(|(var, op, n)| format!("{var}{op}{n}"))
}

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_fraction(),
        arb_decimal(),
        arb_equation(),
        arb_inequality(),
        (1u32..9, 1u32..9, "[a-z]").prop_map(|(a, b, v)| format!("({a}/{b}){v}")),
        (2u32..9, 1u32..9).prop_map(|(k, c)| format!("{k}*(x+{c})")),
        (1u32..9).prop_map(|d| format!("π/{d}")),
        "[ -~]{0,12}",
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn input_is_always_accepted(value in arb_answer()) {
        prop_assert!(expand(&value).contains(&value));
    }

    #[test]
    fn expansion_is_deterministic(value in arb_answer()) {
        prop_assert_eq!(expand(&value), expand(&value));
    }

    #[test]
    fn expansion_is_bounded(value in arb_answer()) {
        prop_assert!(expand(&value).len() <= MAX_VARIANTS);
    }

    #[test]
    fn re_expansion_adds_nothing(value in arb_answer()) {
        let once = expand(&value);
        prop_assume!(once.len() < MAX_VARIANTS);
        for member in &once {
            let again = expand(member);
            prop_assert!(again.is_subset(&once), "{} -> {} escaped the class", value, member);
        }
    }

    #[test]
    fn strict_inequalities_stay_strict(var in "[a-z]", op in prop_oneof![Just(">"), Just("<")], n in -20i32..20) {
        let value = format!("{var}{op}{n}");
        for variant in expand(&value) {
            for non_strict in [">=", "<=", "≥", "≤"] {
                prop_assert!(!variant.contains(non_strict), "{} produced {}", value, variant);
            }
        }
    }

    #[test]
    fn non_terminating_fractions_stay_alone(
        d in prop_oneof![Just(3u32), Just(7), Just(11), Just(13)],
        n in 1u32..3,
    ) {
        let value = format!("{n}/{d}");
        prop_assert_eq!(expand(&value).into_iter().collect::<Vec<_>>(), vec![value]);
    }

    #[test]
    fn terminating_fractions_gain_a_decimal(
        d in prop_oneof![Just(2u32), Just(4), Just(5), Just(8), Just(10), Just(20), Just(25)],
        n in 1u32..100,
    ) {
        let value = format!("{n}/{d}");
        let expected = f64::from(n) / f64::from(d);
        let has_decimal = expand(&value).iter().any(|v| {
            !v.contains('/') && v.parse::<f64>().is_ok_and(|f| (f - expected).abs() < 1e-9)
        });
        prop_assert!(has_decimal, "{} has no decimal form", value);
    }
}
