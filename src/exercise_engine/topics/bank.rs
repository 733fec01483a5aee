//! Exercise-bank variation.
//!
//! Known bank question shapes are regenerated with fresh numbers in the
//! question's own language; everything else goes through [`vary`].
//!
//! | Rule                     | Recognized by                                       |
//! |--------------------------|-----------------------------------------------------|
//! | same-denominator sum     | `a/b + c/b` or `a/b - c/b`                          |
//! | coloured parts           | "divided into N parts ... K coloured / eaten"        |
//! | equivalent to 1/2        | "equivalent to 1/2", "equivalente a 1/2"            |
//! | which is the denominator | "how many equal parts", "es el denominador"         |
//! | which is the numerator   | "is the numerator", "numerador"                     |
//! | largest, same den        | "largest", "la más grande"                          |
//! | smallest, same num       | "smallest", "la más pequeña"                        |
//! | half of an even quantity | "half (1/2)", "la mitad (1/2)"                      |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::exercise_engine::{
    fraction::scan_fractions,
    helpers::{mcq_by_value, shuffle},
    models::{ContentContext, ExerciseItem, NumericRange},
    sanitizer::{sanitize_raw, RawItem},
    text::normalize,
    variation::vary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    En,
    Es,
}

const SPANISH_MARKERS: &[&str] = &["¿", "cuál", "cual ", "fracción", "resuelve", "dividid", "la mitad", "partes"];

impl Lang {
    fn of(key: &str) -> Lang {
        if SPANISH_MARKERS.iter().any(|m| key.contains(m)) {
            Lang::Es
        } else {
            Lang::En
        }
    }

    fn pick(self, en: String, es: String) -> String {
        match self {
            Lang::En => en,
            Lang::Es => es,
        }
    }
}

/// A bank question, normalized once for matching.
struct BankQuestion<'a> {
    text: &'a str,
    key: String,
    lang: Lang,
}

type Rule = fn(&BankQuestion<'_>, &mut StdRng, (u32, u32)) -> Option<ExerciseItem>;

const RULES: &[(&str, Rule)] = &[
    ("same_denominator_sum", same_denominator_sum),
    ("coloured_parts", coloured_parts),
    ("equivalent_to_half", equivalent_to_half),
    ("which_denominator", which_denominator),
    ("which_numerator", which_numerator),
    ("largest_same_denominator", largest_same_denominator),
    ("smallest_same_numerator", smallest_same_numerator),
    ("half_of_quantity", half_of_quantity),
];

/// Vary every bank item. Order and count follow the bank.
pub fn vary_bank(context: &ContentContext, seed: u64, range: NumericRange) -> Vec<ExerciseItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bounds = range.bounds();
    context
        .exercise_bank
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let item = sanitize_raw(&RawItem::from_value(value));
            if let ExerciseItem::MultipleChoice(m) = &item {
                let question = BankQuestion { text: &m.question, key: normalize(&m.question), lang: Lang::of(&normalize(&m.question)) };
                for (name, rule) in RULES {
                    if let Some(varied) = rule(&question, &mut rng, bounds) {
                        debug!(target: "exercise_engine", rule = name, index = i, "bank item regenerated");
                        return varied;
                    }
                }
            }
            vary(&item, seed.wrapping_add(i as u64), range)
        })
        .collect()
}

fn contains_any(key: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| key.contains(n))
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn same_denominator_sum(q: &BankQuestion<'_>, rng: &mut StdRng, (min, max): (u32, u32)) -> Option<ExerciseItem> {
    let tokens = scan_fractions(q.text, None);
    let (first, second) = (tokens.first()?, tokens.get(1)?);
    let between = q.text[first.end..second.start].trim();
    if first.fraction.den != second.fraction.den || !matches!(between, "+" | "-") {
        return None;
    }
    let prefix = q.text[..first.start].trim_end();
    let b = rng.gen_range(min.max(2)..=max);
    let (mut a, mut c) = (rng.gen_range(min..=max), rng.gen_range(min..=max));
    let plus = a == c || rng.gen_bool(0.5);
    if !plus && a < c {
        std::mem::swap(&mut a, &mut c);
    }
    let (op, num) = if plus { ('+', a + c) } else { ('-', a - c) };
    let mut wrongs = vec![
        format!("{num}/{}", 2 * b),
        format!("{a}/{b}"),
        format!("{}/{b}", num.abs_diff(1)),
        format!("{}/{b}", num + 1),
    ];
    shuffle(rng, &mut wrongs);
    wrongs.truncate(3);
    let explain = q.lang.pick(
        "Same denominator: add or subtract the numerators and keep the denominator.".into(),
        "Con el mismo denominador, opera los numeradores y conserva el denominador.".into(),
    );
    let question = format!("{prefix} {a}/{b} {op} {c}/{b} = ?");
    Some(mcq_by_value(question.trim_start(), format!("{num}/{b}"), wrongs, &explain))
}

fn coloured_parts(q: &BankQuestion<'_>, rng: &mut StdRng, (min, max): (u32, u32)) -> Option<ExerciseItem> {
    let divided = contains_any(&q.key, &["dividid", "divided", "split into"]);
    let parts = contains_any(&q.key, &["porciones", "partes", "parts", "slices", "pieces"]);
    let taken = contains_any(&q.key, &["colorea", "come", "comió", "shaded", "coloured", "colored", "eats", "ate "]);
    if !(divided && parts && taken) {
        return None;
    }
    let total = rng.gen_range(min.max(4)..=max.max(5));
    let colored = rng.gen_range(1..total);
    let question = match (q.key.contains("pizza"), q.lang) {
        (true, Lang::Es) => format!(
            "Una pizza está dividida en {total} porciones iguales y un niño se come {colored}. ¿Qué fracción representa lo que comió?"
        ),
        (true, Lang::En) => format!(
            "A pizza is divided into {total} equal slices and a child eats {colored}. What fraction did the child eat?"
        ),
        (false, Lang::Es) => format!(
            "En un rectángulo dividido en {total} partes iguales, {colored} están coloreadas. ¿Qué fracción representa la parte coloreada?"
        ),
        (false, Lang::En) => format!(
            "A rectangle is divided into {total} equal parts and {colored} are shaded. What fraction is shaded?"
        ),
    };
    let explain = q.lang.pick(
        "Numerator: parts taken. Denominator: total equal parts.".into(),
        "Numerador: partes tomadas. Denominador: total de partes iguales.".into(),
    );
    Some(mcq_by_value(
        question,
        format!("{colored}/{total}"),
        vec![
            format!("{total}/{colored}"),
            format!("{}/{total}", colored.saturating_sub(1).max(1)),
            format!("{colored}/{}", (total - 1).max(2)),
        ],
        &explain,
    ))
}

fn equivalent_to_half(q: &BankQuestion<'_>, rng: &mut StdRng, _: (u32, u32)) -> Option<ExerciseItem> {
    if !contains_any(&q.key, &["equivalent to 1/2", "equivalente a 1/2"]) {
        return None;
    }
    let m = rng.gen_range(2..=6u32);
    let near = if m > 2 { m - 1 } else { m + 1 };
    let question = q.lang.pick(
        "Which of these fractions is equivalent to 1/2?".into(),
        "¿Cuál de estas fracciones es equivalente a 1/2?".into(),
    );
    let explain = q.lang.pick(
        "Multiply the numerator and the denominator by the same number.".into(),
        "Multiplica el numerador y el denominador por el mismo número.".into(),
    );
    Some(mcq_by_value(
        question,
        format!("{m}/{}", 2 * m),
        vec![format!("{m}/{m}"), format!("{near}/{}", 2 * m), format!("{}/{m}", 2 * m)],
        &explain,
    ))
}

fn small_fraction(rng: &mut StdRng, (min, max): (u32, u32)) -> (u32, u32) {
    let a = rng.gen_range(min..max);
    (a, rng.gen_range(a + 1..=max))
}

fn which_denominator(q: &BankQuestion<'_>, rng: &mut StdRng, range: (u32, u32)) -> Option<ExerciseItem> {
    let asks = contains_any(
        &q.key,
        &["partes iguales está dividido", "dividido el total", "es el denominador", "how many equal parts", "is the denominator"],
    );
    if !asks || scan_fractions(q.text, None).is_empty() {
        return None;
    }
    let (a, b) = small_fraction(rng, range);
    let question = q.lang.pick(
        format!("In the fraction {a}/{b}, which number tells how many equal parts the whole is divided into?"),
        format!("En la fracción {a}/{b}, ¿cuál número indica en cuántas partes iguales está dividido el total?"),
    );
    let explain = q.lang.pick(
        "The denominator (bottom) is the number of equal parts.".into(),
        "El denominador (abajo) indica el total de partes iguales.".into(),
    );
    Some(mcq_by_value(question, b.to_string(), vec![a.to_string(), (a + b).to_string(), "2".into()], &explain))
}

fn which_numerator(q: &BankQuestion<'_>, rng: &mut StdRng, range: (u32, u32)) -> Option<ExerciseItem> {
    if !contains_any(&q.key, &["numerador", "numerator"]) || scan_fractions(q.text, None).is_empty() {
        return None;
    }
    let (a, b) = small_fraction(rng, range);
    let question = q.lang.pick(
        format!("In the fraction {a}/{b}, which number is the numerator?"),
        format!("En la fracción {a}/{b}, ¿cuál número es el numerador?"),
    );
    let explain = q.lang.pick(
        "The numerator (top) counts the parts taken.".into(),
        "El numerador (arriba) indica las partes consideradas.".into(),
    );
    Some(mcq_by_value(question, a.to_string(), vec![b.to_string(), (a + b).to_string(), "2".into()], &explain))
}

fn largest_same_denominator(q: &BankQuestion<'_>, rng: &mut StdRng, (_, max): (u32, u32)) -> Option<ExerciseItem> {
    if !contains_any(&q.key, &["la más grande", "la mas grande", "largest", "greatest"]) {
        return None;
    }
    let d = rng.gen_range(5..=max.max(5));
    let mut nums: Vec<u32> = (1..d).collect();
    shuffle(rng, &mut nums);
    nums.truncate(4);
    let top = nums.iter().copied().max()?;
    let question = q.lang.pick(
        "Which of these fractions is the largest?".into(),
        "¿Cuál de estas fracciones es la más grande?".into(),
    );
    let explain = q.lang.pick(
        "Same denominator: the larger numerator gives the larger fraction.".into(),
        "Mismo denominador: mayor numerador, fracción mayor.".into(),
    );
    let wrongs = nums.iter().filter(|n| **n != top).map(|n| format!("{n}/{d}")).collect();
    Some(mcq_by_value(question, format!("{top}/{d}"), wrongs, &explain))
}

fn smallest_same_numerator(q: &BankQuestion<'_>, rng: &mut StdRng, (_, max): (u32, u32)) -> Option<ExerciseItem> {
    if !contains_any(&q.key, &["la más pequeña", "la mas pequeña", "la mas pequena", "smallest"]) {
        return None;
    }
    let mut dens: Vec<u32> = (2..=max.max(5)).collect();
    shuffle(rng, &mut dens);
    dens.truncate(4);
    let bottom = dens.iter().copied().max()?;
    let question = q.lang.pick(
        "Which of these fractions is the smallest?".into(),
        "¿Cuál de estas fracciones es la más pequeña?".into(),
    );
    let explain = q.lang.pick(
        "Same numerator: the larger denominator gives the smaller fraction.".into(),
        "Mismo numerador: mayor denominador, fracción menor.".into(),
    );
    let wrongs = dens.iter().filter(|d| **d != bottom).map(|d| format!("1/{d}")).collect();
    Some(mcq_by_value(question, format!("1/{bottom}"), wrongs, &explain))
}

fn half_of_quantity(q: &BankQuestion<'_>, rng: &mut StdRng, (_, max): (u32, u32)) -> Option<ExerciseItem> {
    let half = contains_any(&q.key, &["la mitad (1/2)", "half (1/2)", "half of"]);
    let has_quantity = q.key.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_ascii_digit()).parse::<u32>().is_ok() && !w.contains('/'));
    if !(half && has_quantity) {
        return None;
    }
    let total = 2 * rng.gen_range(3..(max * 2).max(20) / 2);
    let correct = total / 2;
    let question = q.lang.pick(
        format!("You have {total} pencils and give half (1/2) to a friend. How many pencils did you give?"),
        format!("Si tienes {total} lápices y le das la mitad (1/2) a un amigo, ¿cuántos lápices le diste?"),
    );
    let explain = q.lang.pick("Half of T is T/2.".into(), "La mitad de T es T/2.".into());
    Some(mcq_by_value(
        question,
        correct.to_string(),
        vec![total.to_string(), (total / 3).to_string(), correct.saturating_sub(2).max(1).to_string()],
        &explain,
    ))
}
