//! Request and response values exchanged with the Messages API.

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// One text-generation request. Built once by the caller and never mutated;
/// whoever holds it (dispatcher or deferral queue) owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    prompt: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: Option<String>,
}

impl Request {
    /// Request with the built-in defaults; see `RequestDefaults` for
    /// config-driven ones.
    pub fn new(prompt: impl Into<String>) -> Self {
        RequestDefaults::default().request(prompt)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }
}

/// Per-client defaults for fields the caller leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl RequestDefaults {
    pub fn request(&self, prompt: impl Into<String>) -> Request {
        Request {
            prompt: prompt.into(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: None,
        }
    }
}

/// Text produced by a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// Concatenated text content blocks.
    pub text: String,
    pub id: Option<String>,
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl Response {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}
