//! Ambient state rendered into a system prompt.
//!
//! When a history carries no system message, the context builder
//! synthesizes one from a [`World`]. Rendering is deterministic: facts are
//! kept in a sorted map so the same world always yields the same prompt.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

const DEFAULT_PERSONA: &str = "You are a helpful assistant.";

/// Persona plus environment facts.
///
/// ```rust
/// use gen_stack::World;
///
/// let world = World::new("You are a ship's computer.").with_fact("location", "bridge");
/// assert_eq!(
///     world.to_system_prompt(),
///     "You are a ship's computer.\n\nContext:\n- location: bridge"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    /// Instructions describing who the model is.
    pub persona: String,
    /// Named facts about the environment.
    pub facts: BTreeMap<String, String>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_owned(),
            facts: BTreeMap::new(),
        }
    }
}

impl World {
    /// A world with the given persona and no facts.
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            facts: BTreeMap::new(),
        }
    }

    /// Adds or replaces a fact.
    #[must_use]
    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Renders the world as system-prompt text.
    pub fn to_system_prompt(&self) -> String {
        let persona = self.persona.trim();
        let mut prompt = if persona.is_empty() {
            DEFAULT_PERSONA.to_owned()
        } else {
            persona.to_owned()
        };
        if !self.facts.is_empty() {
            prompt.push_str("\n\nContext:");
            for (key, value) in &self.facts {
                let _ = write!(prompt, "\n- {key}: {value}");
            }
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt() {
        assert_eq!(World::default().to_system_prompt(), DEFAULT_PERSONA);
    }

    #[test]
    fn test_blank_persona_falls_back() {
        assert_eq!(World::new("   ").to_system_prompt(), DEFAULT_PERSONA);
    }

    #[test]
    fn test_facts_sorted() {
        let world = World::new("p").with_fact("zeta", "1").with_fact("alpha", "2");
        assert_eq!(
            world.to_system_prompt(),
            "p\n\nContext:\n- alpha: 2\n- zeta: 1"
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let world: World = serde_json::from_str(r#"{"facts": {"k": "v"}}"#).unwrap();
        assert_eq!(world.persona, DEFAULT_PERSONA);
        assert_eq!(world.facts["k"], "v");
    }
}
