//! # Moderation cascade
//! Pure mapping `(text, policy, is_duplicate)` → `Decision`. No I/O.
//!
//! Rules run in a fixed order and the first match decides. Hard-safety hits
//! (empty text, profanity, contact details, direct-contact spam, duplicates)
//! deny; quality and ambiguity signals route to a human; anything left is
//! approved.

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::decision::Decision;
use crate::decision::Rule;
use crate::lexicon::Lexicons;
use crate::policy::Policy;
use crate::signals;
use crate::text::normalize;

/// Caps rule ignores texts shorter than this (chars).
const CAPS_MIN_LEN: usize = 15;

/// Classify one review with the process-wide lexicons.
pub fn classify(text: Option<&str>, policy: &Policy, is_duplicate: bool) -> Decision {
    classify_with(Lexicons::global(), text, policy, is_duplicate)
}

/// Classify one review against explicit lexicons.
pub fn classify_with(
    lex: &Lexicons,
    text: Option<&str>,
    policy: &Policy,
    is_duplicate: bool,
) -> Decision {
    let t = normalize(text);
    let decision = cascade(lex, &t, policy, is_duplicate);
    if *DEV_LOGGING {
        // Never log raw review text.
        debug!(
            target: "moderator",
            id = %anon_hash(&t),
            rule = decision.rule.as_str(),
            classification = decision.classification.label(),
            "review classified"
        );
    }
    decision
}

fn cascade(lex: &Lexicons, t: &str, policy: &Policy, is_duplicate: bool) -> Decision {
    if t.is_empty() {
        return Decision::deny(Rule::Empty, "La reseña está vacía.");
    }

    if let Some(bad) = signals::profanity(t, lex) {
        return Decision::deny(
            Rule::Profanity,
            format!("Contiene lenguaje ofensivo/prohibido (término detectado: '{bad}')."),
        );
    }

    if policy.deny_if_contains_url && signals::contains_url(t) {
        return Decision::deny(
            Rule::Url,
            "Incluye un enlace/URL, lo cual suele considerarse promoción externa o spam.",
        );
    }

    if policy.deny_if_contains_email && signals::contains_email(t) {
        return Decision::deny(
            Rule::Email,
            "Incluye un correo electrónico, lo cual no se permite en reseñas públicas.",
        );
    }

    if policy.deny_if_contains_phone && signals::contains_phone(t) {
        return Decision::deny(
            Rule::Phone,
            "Incluye un número de teléfono, lo cual no se permite en reseñas públicas.",
        );
    }

    if let Some(kw) = signals::spam_keyword(t, lex) {
        if lex.is_direct_contact(kw) {
            return Decision::deny(
                Rule::ContactSpam,
                format!("Se detectó posible promoción/spam con contacto directo (señal: '{kw}')."),
            );
        }
        return Decision::review(
            Rule::Promo,
            format!("La reseña tiene señales de promoción o manipulación (señal: '{kw}')."),
            format!("Posible contenido promocional (señal: '{kw}')."),
        );
    }

    if policy.deny_if_duplicate && is_duplicate {
        return Decision::deny(
            Rule::Duplicate,
            "La reseña es un duplicado exacto dentro del archivo cargado.",
        );
    }

    if signals::caps_ratio(t) >= policy.caps_ratio_human && t.chars().count() >= CAPS_MIN_LEN {
        return Decision::review(
            Rule::Caps,
            "La reseña está escrita mayormente en mayúsculas, lo cual afecta legibilidad y tono.",
            "Texto mayormente en MAYÚSCULAS.",
        );
    }

    if signals::exclamation_count(t) >= policy.excessive_exclamations_human {
        return Decision::review(
            Rule::Exclamations,
            "Tiene un exceso de signos de exclamación, lo cual puede percibirse como spam o tono agresivo.",
            "Exceso de signos de exclamación.",
        );
    }

    if signals::question_count(t) >= policy.excessive_question_human {
        return Decision::review(
            Rule::Questions,
            "Tiene muchas preguntas; podría no ser una reseña útil sino una consulta.",
            "Exceso de signos de interrogación.",
        );
    }

    if signals::repeated_char_run(t, policy.max_repeated_char_run) {
        return Decision::review(
            Rule::RepeatedChars,
            "Se detectaron repeticiones exageradas de caracteres, lo cual reduce calidad y legibilidad.",
            "Repetición exagerada de caracteres.",
        );
    }

    if signals::repeated_word_ratio(t) >= policy.max_repeated_word_ratio {
        return Decision::review(
            Rule::RepeatedWords,
            "La reseña repite excesivamente una palabra; puede ser spam o baja calidad.",
            "Repetición excesiva de palabras.",
        );
    }

    if let Some(marker) = signals::sarcasm_marker(t, lex) {
        return Decision::review(
            Rule::Sarcasm,
            format!(
                "Podría contener sarcasmo o ambigüedad semántica (señal: '{marker}'); conviene validar manualmente."
            ),
            format!("Posible sarcasmo/ambigüedad (señal: '{marker}')."),
        );
    }

    if signals::mixed_sentiment(t, lex) {
        return Decision::review(
            Rule::MixedSentiment,
            "Combina señales positivas y negativas; puede ser ambigua.",
            "Sentimiento mixto (positivo y negativo).",
        );
    }

    if signals::is_gibberish(t) {
        return Decision::review(
            Rule::Gibberish,
            "El texto parece poco legible o con exceso de símbolos; requiere verificación manual.",
            "Baja legibilidad / texto confuso.",
        );
    }

    if signals::short_or_low_info(t, policy.min_words_for_approve, policy.min_chars_for_approve) {
        return Decision::review(
            Rule::LowInfo,
            "La reseña es muy corta o aporta poca información útil para otros usuarios.",
            "Contenido muy corto / baja utilidad.",
        );
    }

    Decision::approve(
        "Cumple criterios de legibilidad y comportamiento aceptable (sin señales de spam/ofensivo).",
    )
}

/// Read once per process; per-row checks never touch the environment.
static DEV_LOGGING: Lazy<bool> = Lazy::new(dev_logging_enabled);

// Dev logging gate: MODERATOR_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("MODERATOR_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short, stable fingerprint of a text (or any bytes) for logs and download tokens.
pub(crate) fn anon_hash(data: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(data.as_ref());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
