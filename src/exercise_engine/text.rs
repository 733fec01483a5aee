//! String normalization shared by every equality and dedup check.
//!
//! Items coming from the model are full of incidental formatting noise:
//! doubled spaces, `"1 / 2"` next to `"1/2"`, `"Option A"` left where a real
//! distractor should be. Everything that compares strings goes through
//! [`normalize`]; everything that stores a string goes through [`clean`].

/// Trim and collapse inner whitespace. The display form of every stored string.
pub fn clean(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key: cleaned, lowercased, no spaces around `/`.
pub fn normalize(s: &str) -> String {
    clean(s)
        .to_lowercase()
        .replace(" / ", "/")
        .replace(" /", "/")
        .replace("/ ", "/")
}

/// Words a model uses when it fills a slot instead of writing a distractor.
const PLACEHOLDER_WORDS: &[&str] = &[
    "option", "opción", "opcion", "choice", "alternative", "alternativa",
    "answer", "respuesta", "incorrect", "incorrecta", "incorrecto",
    "wrong", "correct", "correcta", "correcto", "distractor",
];

const PLACEHOLDER_LITERALS: &[&str] = &["", "...", "…", "-", "--", "?", "n/a", "na", "tbd", "null", "none"];

fn strip_label_punct(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, '.' | ':' | ')' | '(' | '#' | '-' | ','))
}

/// True for choice strings like `"Option B"`, `"Distractor 2"`, `"Incorrecta 1"`.
pub fn is_placeholder_choice(s: &str) -> bool {
    let key = normalize(s);
    if PLACEHOLDER_LITERALS.contains(&key.as_str()) {
        return true;
    }
    let tokens: Vec<&str> = key.split(' ').map(strip_label_punct).filter(|t| !t.is_empty()).collect();
    if tokens.iter().any(|t| *t == "distractor") {
        return true;
    }
    let rest: Vec<&str> = tokens
        .iter()
        .copied()
        .skip_while(|t| PLACEHOLDER_WORDS.contains(t))
        .collect();
    if rest.len() == tokens.len() {
        return false;
    }
    match rest.as_slice() {
        [] => true,
        [label] => label.chars().count() <= 2 && label.chars().all(char::is_alphanumeric),
        _ => false,
    }
}

const GENERIC_QUESTIONS: &[&str] = &[
    "question", "pregunta", "enunciado", "prompt",
    "choose the correct option", "choose the correct answer",
    "select the correct answer", "select the correct option",
    "pick the correct answer", "elige la opción correcta",
    "elige la opcion correcta", "elige la respuesta correcta",
    "selecciona la respuesta correcta",
];

/// True when a question is empty or a template leftover with no content.
pub fn is_generic_question(s: &str) -> bool {
    let key = normalize(s);
    let key = key
        .trim_start_matches('¿')
        .trim_end_matches(|c: char| matches!(c, '.' | '?' | ':' | '!'))
        .trim();
    if key.is_empty() || !key.chars().any(char::is_alphanumeric) {
        return true;
    }
    if GENERIC_QUESTIONS.contains(&key) {
        return true;
    }
    match key.split_once(' ') {
        Some((head, tail)) => {
            matches!(head, "question" | "pregunta") && tail.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Truncate to `max` chars, marking the cut with an ellipsis.
pub fn short(text: &str, max: usize) -> String {
    let t = text.trim();
    if t.chars().count() <= max {
        return t.to_string();
    }
    let mut out: String = t.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Rewrite listening prompts for an auditory session that has no audio.
pub fn neutralize_audio_words(question: &str) -> String {
    let q = question.trim();
    let lower = q.to_lowercase();
    let listening = lower.starts_with("escucha ")
        || lower.contains("escucha atentamente")
        || lower.contains("te dictan")
        || lower.starts_with("listen ")
        || lower.contains("listen carefully");
    if !listening {
        return q.to_string();
    }
    q.replace("Escucha atentamente ", "Lee atentamente ")
        .replace("Escucha ", "Lee ")
        .replace("te dictan", "se presentan")
        .replace("Listen carefully ", "Read carefully ")
        .replace("Listen to ", "Read ")
        .replace("Listen ", "Read ")
}
