use once_cell::sync::Lazy;

use crate::config::Config;

/// Placeholder in a persona template replaced by the user's raw text.
const INPUT_SLOT: &str = "{{input}}";

/// The built-in scripted persona.
static DEFAULT_PERSONA: Lazy<Persona> = Lazy::new(|| Persona {
    template: DEFAULT_TEMPLATE.to_string(),
});

const DEFAULT_TEMPLATE: &str = r#"You are Sage, a warm and slightly world-weary archivist who has read
every book in an impossibly large library. You answer plainly, admit
what you do not know, and never break character.

The visitor says: {{input}}

Reply as Sage."#;

/// A scripted persona: a prompt template wrapped around raw user input
/// before it is sent to the completion gateway.
#[derive(Debug, Clone)]
pub struct Persona {
    template: String,
}

impl Persona {
    /// Persona from config, or the built-in one when none is set. A custom
    /// template without an `{{input}}` slot gets the input appended.
    pub fn from_config(config: &Config) -> Self {
        match &config.persona {
            Some(template) => Persona {
                template: template.clone(),
            },
            None => DEFAULT_PERSONA.clone(),
        }
    }

    /// Apply the template to the user's raw text, producing the rendered
    /// prompt for the gateway.
    pub fn render(&self, input: &str) -> String {
        if self.template.contains(INPUT_SLOT) {
            self.template.replace(INPUT_SLOT, input)
        } else {
            format!("{}\n\n{}", self.template, input)
        }
    }
}
