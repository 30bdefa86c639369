//! Element and sequence context
//!
//! Role resolution is a pure function over host-captured element facts; the
//! engine never inspects the DOM itself. For behaviors detected at a bare
//! point (scroll probes, dwell anchors) the host can supply a [`DomProbe`]
//! that answers hit tests on demand.

use crate::types::{ElementContext, ElementFacts, ElementRole, EmotionRecord, Point, SequenceTag};

/// Host-side hit testing. A probe failure means no role, never an error.
pub trait DomProbe {
    fn probe(&self, point: Point) -> Option<ElementFacts>;
}

/// Probe that never resolves anything; the default for headless hosts.
#[derive(Debug, Default)]
pub struct NullProbe;

impl DomProbe for NullProbe {
    fn probe(&self, _point: Point) -> Option<ElementFacts> {
        None
    }
}

const PRICE_CLASS_HINTS: &[&str] = &["price", "cost", "total", "amount", "currency"];
const CTA_CLASS_HINTS: &[&str] = &["btn", "button", "cta", "buy", "checkout", "add-to-cart", "subscribe"];
const CTA_TEXT_HINTS: &[&str] = &["buy", "add to cart", "checkout", "order", "subscribe", "sign up", "get started"];
const FORM_TAGS: &[&str] = &["input", "select", "textarea", "form", "label"];

/// Resolve the semantic role of an element from its captured facts.
///
/// Priority order: price beats call-to-action beats navigation beats form,
/// so a buy button inside a nav bar still reads as a CTA.
pub fn resolve_role(facts: &ElementFacts) -> Option<ElementRole> {
    let text = facts.text.to_lowercase();

    let price_class = facts
        .classes
        .iter()
        .any(|c| PRICE_CLASS_HINTS.iter().any(|h| c.contains(h)));
    if price_class || looks_like_price(&text) {
        return Some(ElementRole::Price);
    }

    let cta_tag = facts.tag == "button";
    let cta_class = facts
        .classes
        .iter()
        .any(|c| CTA_CLASS_HINTS.iter().any(|h| c.contains(h)));
    let cta_text = CTA_TEXT_HINTS.iter().any(|h| text.contains(h));
    if cta_tag || cta_class || cta_text {
        return Some(ElementRole::Cta);
    }

    if facts.in_nav || facts.tag == "nav" {
        return Some(ElementRole::Navigation);
    }

    if facts.in_form || FORM_TAGS.contains(&facts.tag.as_str()) {
        return Some(ElementRole::Form);
    }

    None
}

/// Currency-bearing text reads as a price regardless of markup.
fn looks_like_price(text: &str) -> bool {
    let has_currency = text.contains('$')
        || text.contains('€')
        || text.contains('£')
        || text.contains('¥')
        || text.contains("usd")
        || text.contains("eur");
    has_currency && text.chars().any(|c| c.is_ascii_digit())
}

/// Derive the sequence tag from the trailing emotion history.
///
/// A negative emotion inside the window makes everything that follows
/// read as after-frustration; otherwise a recent positive record tags
/// after-success.
pub fn resolve_sequence_tag(
    history: &[EmotionRecord],
    now_ms: u64,
    window_ms: u64,
) -> Option<SequenceTag> {
    let recent = history
        .iter()
        .rev()
        .take_while(|r| now_ms.saturating_sub(r.t_ms) <= window_ms);
    let mut saw_positive = false;
    for record in recent {
        if record.emotion.is_negative() {
            return Some(SequenceTag::AfterFrustration);
        }
        saw_positive = true;
    }
    if saw_positive {
        Some(SequenceTag::AfterSuccess)
    } else {
        None
    }
}

/// Assemble the full context for one occurrence.
pub fn resolve_context(
    target: Option<&ElementFacts>,
    history: &[EmotionRecord],
    now_ms: u64,
    window_ms: u64,
) -> ElementContext {
    ElementContext {
        role: target.and_then(resolve_role),
        sequence_tag: resolve_sequence_tag(history, now_ms, window_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BehaviorKind, Emotion};

    fn facts(tag: &str, classes: &[&str], text: &str) -> ElementFacts {
        ElementFacts {
            tag: tag.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            text: text.to_string(),
            in_form: false,
            in_nav: false,
        }
    }

    fn record(emotion: Emotion, t_ms: u64) -> EmotionRecord {
        EmotionRecord {
            behavior: BehaviorKind::Hover,
            emotion,
            confidence: 70.0,
            t_ms,
            context: ElementContext::default(),
        }
    }

    #[test]
    fn test_price_from_class() {
        let role = resolve_role(&facts("span", &["product-price"], "1299"));
        assert_eq!(role, Some(ElementRole::Price));
    }

    #[test]
    fn test_price_from_currency_text() {
        let role = resolve_role(&facts("div", &[], "$49.99"));
        assert_eq!(role, Some(ElementRole::Price));
    }

    #[test]
    fn test_currency_symbol_without_digits_is_not_price() {
        assert_eq!(resolve_role(&facts("div", &[], "prices in $")), None);
    }

    #[test]
    fn test_cta_from_button_tag() {
        let role = resolve_role(&facts("button", &[], "Continue"));
        assert_eq!(role, Some(ElementRole::Cta));
    }

    #[test]
    fn test_cta_from_text_phrase() {
        let role = resolve_role(&facts("a", &[], "Add to Cart"));
        assert_eq!(role, Some(ElementRole::Cta));
    }

    #[test]
    fn test_price_beats_cta() {
        let role = resolve_role(&facts("button", &["price-toggle"], "Show price"));
        assert_eq!(role, Some(ElementRole::Price));
    }

    #[test]
    fn test_navigation_and_form() {
        let mut nav = facts("a", &[], "Docs");
        nav.in_nav = true;
        assert_eq!(resolve_role(&nav), Some(ElementRole::Navigation));

        assert_eq!(resolve_role(&facts("input", &[], "")), Some(ElementRole::Form));
    }

    #[test]
    fn test_plain_element_has_no_role() {
        assert_eq!(resolve_role(&facts("p", &[], "hello world")), None);
    }

    #[test]
    fn test_after_frustration_within_window() {
        let history = vec![record(Emotion::Frustration, 1_000)];
        let tag = resolve_sequence_tag(&history, 3_000, 5_000);
        assert_eq!(tag, Some(SequenceTag::AfterFrustration));
    }

    #[test]
    fn test_frustration_outside_window_ignored() {
        let history = vec![record(Emotion::Frustration, 1_000)];
        assert_eq!(resolve_sequence_tag(&history, 10_000, 5_000), None);
    }

    #[test]
    fn test_after_success_from_positive_history() {
        let history = vec![record(Emotion::Engagement, 2_000)];
        let tag = resolve_sequence_tag(&history, 3_000, 5_000);
        assert_eq!(tag, Some(SequenceTag::AfterSuccess));
    }

    #[test]
    fn test_negative_anywhere_in_window_wins() {
        let history = vec![
            record(Emotion::Frustration, 1_500),
            record(Emotion::Engagement, 2_500),
        ];
        let tag = resolve_sequence_tag(&history, 3_000, 5_000);
        assert_eq!(tag, Some(SequenceTag::AfterFrustration));
    }

    #[test]
    fn test_null_probe() {
        assert!(NullProbe.probe(Point::new(1.0, 2.0)).is_none());
    }
}
