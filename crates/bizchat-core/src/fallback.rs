//! Canned replies used when the chat backend cannot be reached.

use std::sync::OnceLock;

use rand::Rng;
use regex::{Captures, Regex};

use crate::state::BusinessProfile;

/// Fixed reply templates. `{name}` placeholders are filled from the profile.
pub const TEMPLATES: [&str; 4] = [
    "Great question! For a {product} business focused on {targetCustomer}, \
     I'd start by strengthening your presence in {mainChannels}. \
     Since you're serving the {geographicMarket} market with a {pricingStrategy} pricing strategy, \
     make sure every message highlights the value you offer.",
    "Here's a thought: **{targetCustomer}** in the {geographicMarket} market respond well to clear offers.\n\
     * Lead with what makes your {product} different\n\
     * Keep your {pricingStrategy} pricing visible\n\
     * Double down on {mainChannels}",
    "Based on your profile, your {product} could grow by testing small campaigns on {mainChannels}. \
     Track which messages resonate with {targetCustomer}, and check that your {pricingStrategy} \
     pricing still fits the {geographicMarket} market as you scale.",
    "Let's break it down:\n\n\
     **Audience:** {targetCustomer}\n\
     **Market:** {geographicMarket}\n\
     **Pricing:** {pricingStrategy}\n\n\
     With {product} as your offer, {mainChannels} is where I'd invest first.",
];

/// Shown when handling a send fails in an unexpected way.
pub const APOLOGY_REPLY: &str =
    "I'm sorry, something went wrong while preparing a reply. Please try again.";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Replace `{key}` with the matching profile field. Unknown keys stay as written.
pub fn fill_template(template: &str, profile: &BusinessProfile) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match profile.field(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Pick a template uniformly at random and fill it.
pub fn fallback_reply<R: Rng + ?Sized>(rng: &mut R, profile: &BusinessProfile) -> String {
    let template = TEMPLATES[rng.gen_range(0..TEMPLATES.len())];
    fill_template(template, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn profile() -> BusinessProfile {
        BusinessProfile {
            product: "coffee".into(),
            target_customer: "students".into(),
            geographic_market: "local".into(),
            pricing_strategy: "low-cost".into(),
            main_channels: "social media".into(),
        }
    }

    #[test]
    fn test_every_template_uses_all_fields() {
        for template in TEMPLATES {
            for key in BusinessProfile::FIELD_KEYS {
                assert!(template.contains(&format!("{{{}}}", key)), "{key} missing");
            }
        }
    }

    #[test]
    fn test_fill_template_substitutes_fields() {
        let filled = fill_template("{product} for {targetCustomer}", &profile());
        assert_eq!(filled, "coffee for students");
    }

    #[test]
    fn test_unknown_placeholder_passes_through() {
        let filled = fill_template("{product} and {budget}", &profile());
        assert_eq!(filled, "coffee and {budget}");
    }

    #[test]
    fn test_fallback_reply_is_seed_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..8 {
            assert_eq!(fallback_reply(&mut a, &profile()), fallback_reply(&mut b, &profile()));
        }
    }

    #[test]
    fn test_fallback_reply_reaches_every_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let filled: Vec<String> = TEMPLATES.iter().map(|t| fill_template(t, &profile())).collect();
        let mut seen = [false; 4];
        for _ in 0..200 {
            let reply = fallback_reply(&mut rng, &profile());
            let idx = filled.iter().position(|f| *f == reply).unwrap();
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
