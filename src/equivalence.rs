//! Answer Equivalence - one canonical value, every accepted spelling
//!
//! Each rule is a pure function from a value to the variants it implies.
//! `expand` folds all rules over a value and keeps folding over whatever is
//! new until nothing is added, so the result is closed: expanding any member
//! again yields nothing outside the set.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Hard cap on the size of one equivalence class.
pub const MAX_VARIANTS: usize = 256;

/// π is matched at this precision on purpose. Graders accept `3.14`-based
/// answers, not higher-precision ones.
const PI_APPROXIMATION: &str = "3.14";

type Rule = fn(&str) -> BTreeSet<String>;

const RULES: &[(&str, Rule)] = &[
    ("leading_zero", leading_zero),
    ("fraction_decimal", fraction_to_decimal),
    ("fractional_coefficient", fractional_coefficient),
    ("algebraic_spacing", algebraic_spacing),
    ("implicit_multiplication", implicit_multiplication),
    ("inequality", inequality),
    ("equation_sides", equation_sides),
    ("pi_approximation", pi_approximation),
];

static ZERO_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?)0\.(\d+)$").unwrap());
static BARE_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(-?)\.(\d+)$").unwrap());
static FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(-?)(\d+)/(\d+)$").unwrap());
static PAREN_COEFFICIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?)\((\d+)/(\d+)\)([a-zA-Z]+)$").unwrap());
static SLASH_COEFFICIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?)(\d+)/(\d+)([a-zA-Z]+)$").unwrap());
static VARIABLE_OVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?)(\d*)([a-zA-Z]+)/(\d+)$").unwrap());
static IMPLICIT_PRODUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*\*\s*\(").unwrap());
static COMPARISON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<=|>=|≤|≥|<|>").unwrap());
static PI_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?)(\d+(?:\.\d+)?|\.\d+)?\s*\*?\s*(π|pi)(?:\s*/\s*(\d+))?$").unwrap()
});
static PI_TIMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?)(π|pi)\s*\*\s*(\d+(?:\.\d+)?|\.\d+)$").unwrap());

/// Expand one accepted value into its full equivalence class.
///
/// The input is always a member of the result.
pub fn expand(value: &str) -> BTreeSet<String> {
    let mut accepted = BTreeSet::from([value.to_string()]);
    let mut frontier = vec![value.to_string()];

    while let Some(current) = frontier.pop() {
        let additions = RULES.iter().fold(BTreeSet::new(), |mut acc, (_, rule)| {
            acc.extend(rule(&current));
            acc
        });

        for variant in additions {
            if variant.is_empty() || accepted.contains(&variant) {
                continue;
            }
            if accepted.len() >= MAX_VARIANTS {
                tracing::warn!(value, cap = MAX_VARIANTS, "equivalence class truncated");
                return accepted;
            }
            accepted.insert(variant.clone());
            frontier.push(variant);
        }
    }

    accepted
}

/// Names of the rules that contribute at least one variant for `value`.
pub fn matching_rules(value: &str) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|(_, rule)| rule(value).iter().any(|v| v != value))
        .map(|(name, _)| *name)
        .collect()
}

// --- Rules ---

fn leading_zero(value: &str) -> BTreeSet<String> {
    let v = value.trim();
    let mut out = BTreeSet::new();
    if let Some(c) = ZERO_DECIMAL.captures(v) {
        out.insert(format!("{}.{}", &c[1], &c[2]));
    } else if let Some(c) = BARE_DECIMAL.captures(v) {
        out.insert(format!("{}0.{}", &c[1], &c[2]));
    }
    out
}

fn fraction_to_decimal(value: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    if let Some(c) = FRACTION.captures(value.trim()) {
        let decimal = parse_fraction(&c[2], &c[3]).and_then(Ratio::to_decimal);
        if let Some(d) = decimal {
            out.insert(format!("{}{}", &c[1], d));
        }
    }
    out
}

fn fractional_coefficient(value: &str) -> BTreeSet<String> {
    coefficient_forms(value.trim()).unwrap_or_default()
}

fn coefficient_forms(v: &str) -> Option<BTreeSet<String>> {
    let (sign, num, den, var) = if let Some(c) = PAREN_COEFFICIENT.captures(v) {
        (c[1].to_string(), c[2].to_string(), c[3].to_string(), c[4].to_string())
    } else if let Some(c) = SLASH_COEFFICIENT.captures(v) {
        (c[1].to_string(), c[2].to_string(), c[3].to_string(), c[4].to_string())
    } else if let Some(c) = VARIABLE_OVER.captures(v) {
        let num = if c[2].is_empty() { "1" } else { &c[2] };
        (c[1].to_string(), num.to_string(), c[4].to_string(), c[3].to_string())
    } else {
        return None;
    };

    let ratio = parse_fraction(&num, &den)?;
    let mut out = BTreeSet::from([
        format!("{sign}({num}/{den}){var}"),
        format!("{sign}{num}/{den}{var}"),
        format!("{sign}{num}{var}/{den}"),
    ]);
    if num == "1" {
        out.insert(format!("{sign}{var}/{den}"));
    }
    if let Some(decimal) = ratio.to_decimal() {
        if decimal == "1" {
            out.insert(format!("{sign}{var}"));
        } else {
            out.insert(format!("{sign}{decimal}{var}"));
            if let Some(bare) = decimal.strip_prefix('0') {
                out.insert(format!("{sign}{bare}{var}"));
            }
        }
    }
    Some(out)
}

fn algebraic_spacing(value: &str) -> BTreeSet<String> {
    if !value.chars().any(|c| "()=+-*/^".contains(c)) {
        return BTreeSet::new();
    }
    let compact = compact(value);
    let spaced = space_operators(&compact);
    BTreeSet::from([compact, spaced])
}

fn implicit_multiplication(value: &str) -> BTreeSet<String> {
    let rewritten = IMPLICIT_PRODUCT.replace_all(value, "$1(");
    let mut out = BTreeSet::new();
    if rewritten != value {
        out.insert(rewritten.into_owned());
    }
    out
}

fn inequality(value: &str) -> BTreeSet<String> {
    let v = compact(value);
    let ops: Vec<_> = COMPARISON.find_iter(&v).collect();
    if ops.len() != 1 {
        return BTreeSet::new();
    }
    let m = ops[0];
    let (left, right) = (&v[..m.start()], &v[m.end()..]);
    if left.is_empty() || right.is_empty() || left.contains('=') || right.contains('=') {
        return BTreeSet::new();
    }
    let Some(op) = Comparison::parse(m.as_str()) else {
        return BTreeSet::new();
    };

    let mut out = BTreeSet::new();
    for spelling in op.spellings() {
        let form = format!("{left}{spelling}{right}");
        out.insert(space_operators(&form));
        out.insert(form);
    }
    for spelling in op.flip().spellings() {
        let form = format!("{right}{spelling}{left}");
        out.insert(space_operators(&form));
        out.insert(form);
    }
    out
}

fn equation_sides(value: &str) -> BTreeSet<String> {
    let v = compact(value);
    if COMPARISON.is_match(&v) {
        return BTreeSet::new();
    }
    let sides: Vec<&str> = v.split('=').collect();
    let [left, right] = sides.as_slice() else {
        return BTreeSet::new();
    };
    if left.is_empty() || right.is_empty() {
        return BTreeSet::new();
    }

    let forward = format!("{left}={right}");
    let reversed = format!("{right}={left}");
    BTreeSet::from([
        space_operators(&forward),
        space_operators(&reversed),
        forward,
        reversed,
    ])
}

fn pi_approximation(value: &str) -> BTreeSet<String> {
    pi_forms(value.trim()).unwrap_or_default()
}

fn pi_forms(v: &str) -> Option<BTreeSet<String>> {
    let (sign, coefficient, symbol, divisor) = if let Some(c) = PI_TERM.captures(v) {
        let coefficient = c.get(2).map_or("1", |m| m.as_str()).to_string();
        let divisor = c.get(4).map_or("1", |m| m.as_str()).to_string();
        (c[1].to_string(), coefficient, c[3].to_string(), divisor)
    } else if let Some(c) = PI_TIMES.captures(v) {
        (c[1].to_string(), c[3].to_string(), c[2].to_string(), "1".to_string())
    } else {
        return None;
    };

    let mut out = BTreeSet::new();
    let other = if symbol == "π" { "pi" } else { "π" };
    out.insert(v.replace(symbol.as_str(), other));

    let divisor: u128 = divisor.parse().ok()?;
    let approx = Ratio::parse_decimal(&coefficient)?
        .checked_mul(Ratio::parse_decimal(PI_APPROXIMATION)?)?
        .checked_div_int(divisor)?;
    if let Some(decimal) = approx.to_decimal() {
        out.insert(format!("{sign}{decimal}"));
    }
    Some(out)
}

// --- Helpers ---

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Single spaces around `=`, `+`, binary `-`, `*` and comparison operators.
/// `/` and `^` bind tightly and stay unspaced.
fn space_operators(compact: &str) -> String {
    let chars: Vec<char> = compact.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = String::with_capacity(chars.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if (c == '<' || c == '>') && chars.get(i + 1) == Some(&'=') {
            push_operator(&mut out, &format!("{c}="));
            i += 2;
            continue;
        }
        match c {
            '=' | '+' | '*' | '<' | '>' | '≤' | '≥' => push_operator(&mut out, &c.to_string()),
            '-' if is_binary_context(&out) => push_operator(&mut out, "-"),
            _ => out.push(c),
        }
        i += 1;
    }

    out.trim().to_string()
}

fn push_operator(out: &mut String, op: &str) {
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push(' ');
    out.push_str(op);
    out.push(' ');
}

fn is_binary_context(out: &str) -> bool {
    out.trim_end()
        .chars()
        .last()
        .is_some_and(|p| p.is_alphanumeric() || p == ')' || p == '.' || p == 'π')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Self::Less),
            "<=" | "≤" => Some(Self::LessEqual),
            ">" => Some(Self::Greater),
            ">=" | "≥" => Some(Self::GreaterEqual),
            _ => None,
        }
    }

    fn spellings(self) -> &'static [&'static str] {
        match self {
            Self::Less => &["<"],
            Self::LessEqual => &["<=", "≤"],
            Self::Greater => &[">"],
            Self::GreaterEqual => &[">=", "≥"],
        }
    }

    fn flip(self) -> Self {
        match self {
            Self::Less => Self::Greater,
            Self::LessEqual => Self::GreaterEqual,
            Self::Greater => Self::Less,
            Self::GreaterEqual => Self::LessEqual,
        }
    }
}

fn parse_fraction(num: &str, den: &str) -> Option<Ratio> {
    Ratio::new(num.parse().ok()?, den.parse().ok()?)
}

/// Non-negative exact rational, always reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    num: u128,
    den: u128,
}

impl Ratio {
    fn new(num: u128, den: u128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// `"2.5"`, `".5"`, `"3"`.
    fn parse_decimal(s: &str) -> Option<Self> {
        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        if int.is_empty() && frac.is_empty() {
            return None;
        }
        let digits = format!("{int}{frac}");
        let num: u128 = digits.parse().ok()?;
        let den = 10u128.checked_pow(u32::try_from(frac.len()).ok()?)?;
        Self::new(num, den)
    }

    fn checked_mul(self, other: Self) -> Option<Self> {
        Self::new(
            self.num.checked_mul(other.num)?,
            self.den.checked_mul(other.den)?,
        )
    }

    fn checked_div_int(self, divisor: u128) -> Option<Self> {
        Self::new(self.num, self.den.checked_mul(divisor)?)
    }

    /// Exact decimal rendering, or `None` when the expansion does not
    /// terminate (denominator has a prime factor other than 2 and 5).
    fn to_decimal(self) -> Option<String> {
        let (mut rest, mut twos, mut fives) = (self.den, 0u32, 0u32);
        while rest % 2 == 0 {
            rest /= 2;
            twos += 1;
        }
        while rest % 5 == 0 {
            rest /= 5;
            fives += 1;
        }
        if rest != 1 {
            return None;
        }

        let places = twos.max(fives);
        let scale = 10u128.checked_pow(places)?;
        let scaled = self.num.checked_mul(scale / self.den)?;
        let (int, frac) = (scaled / scale, scaled % scale);
        if frac == 0 {
            return Some(int.to_string());
        }
        let frac = format!("{:0width$}", frac, width = places as usize);
        Some(format!("{}.{}", int, frac.trim_end_matches('0')))
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
