//! Builds the canonical message list for a generation request.
//!
//! Three shapes of conversation are produced:
//! - single shot, from text or from text plus an image
//! - presentation planning (step 0), which asks for a textual plan
//! - presentation steps (1..=N), which see the plan and the elements drawn so far
//!
//! Every list starts with exactly one system message and ends with a user message.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chart::ChartType;
use crate::errors::ComposeError;
use crate::models::content::ImageContent;
use crate::models::message::Message;
use crate::prompt_template::load_prompt;
use crate::providers::configs::ProviderConfig;

const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");
const USER_PROMPT: &str = include_str!("prompts/user.md");
const PLAN_SYSTEM_PROMPT: &str = include_str!("prompts/plan_system.md");
const PLAN_PROMPT: &str = include_str!("prompts/plan.md");
const PRESENTATION_SYSTEM_PROMPT: &str = include_str!("prompts/presentation_system.md");
const PRESENTATION_STEP_PROMPT: &str = include_str!("prompts/presentation_step.md");

/// What the user asked for: free text, optionally with an image to reproduce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserInput {
    WithImage { text: String, image: ImageContent },
    Text(String),
}

impl UserInput {
    pub fn text(&self) -> &str {
        match self {
            UserInput::Text(text) => text,
            UserInput::WithImage { text, .. } => text,
        }
    }

    pub fn image(&self) -> Option<&ImageContent> {
        match self {
            UserInput::Text(_) => None,
            UserInput::WithImage { image, .. } => Some(image),
        }
    }

    /// Empty text with no image carries nothing to draw
    pub fn is_empty(&self) -> bool {
        match self {
            UserInput::Text(text) => text.is_empty(),
            UserInput::WithImage { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationMode {
    SingleShot,
    /// Presentation step 0: produce the drawing plan
    PresentationPlan,
    /// Presentation step 1..=N: produce only the elements this step adds
    PresentationStep {
        plan: String,
        existing_elements: Vec<Value>,
        step_number: u32,
        total_steps: u32,
    },
}

impl GenerationMode {
    /// Pick the mode from the flags a client sends.
    ///
    /// A presentation request without a plan (or with an empty one) is the planning call.
    pub fn from_request(
        presentation_mode: bool,
        plan: Option<String>,
        existing_elements: Option<Vec<Value>>,
        step_number: Option<u32>,
        total_steps: Option<u32>,
    ) -> Self {
        if !presentation_mode {
            return GenerationMode::SingleShot;
        }
        match plan.filter(|p| !p.is_empty()) {
            None => GenerationMode::PresentationPlan,
            Some(plan) => {
                let step_number = step_number.unwrap_or(1);
                GenerationMode::PresentationStep {
                    plan,
                    existing_elements: existing_elements.unwrap_or_default(),
                    step_number,
                    total_steps: total_steps.unwrap_or(step_number),
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::SingleShot => "single-shot",
            GenerationMode::PresentationPlan => "presentation-plan",
            GenerationMode::PresentationStep { .. } => "presentation-step",
        }
    }
}

/// One generation call, constructed per HTTP request and discarded once its stream closes
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub config: ProviderConfig,
    pub input: UserInput,
    pub chart_type: ChartType,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn messages(&self) -> Result<Vec<Message>, ComposeError> {
        compose(&self.input, self.chart_type, &self.mode)
    }
}

/// Build the conversation for the given input and mode
pub fn compose(
    input: &UserInput,
    chart_type: ChartType,
    mode: &GenerationMode,
) -> Result<Vec<Message>, ComposeError> {
    let messages = match mode {
        GenerationMode::SingleShot => {
            let content = load_prompt(
                USER_PROMPT,
                &json!({
                    "input": input.text(),
                    "chart_name": chart_type.display_name(),
                    "auto": chart_type.is_auto(),
                    "has_image": input.image().is_some(),
                }),
            )?;
            let mut user = Message::user().with_text(content);
            if let Some(image) = input.image() {
                user = user.with_image(image.clone());
            }
            vec![Message::system().with_text(SYSTEM_PROMPT), user]
        }
        GenerationMode::PresentationPlan => {
            let content = load_prompt(
                PLAN_PROMPT,
                &json!({
                    "input": input.text(),
                    "chart_name": chart_type.display_name(),
                    "auto": chart_type.is_auto(),
                }),
            )?;
            vec![
                Message::system().with_text(PLAN_SYSTEM_PROMPT.trim_end()),
                Message::user().with_text(content),
            ]
        }
        GenerationMode::PresentationStep {
            plan,
            existing_elements,
            step_number,
            total_steps,
        } => {
            let content = load_prompt(
                PRESENTATION_STEP_PROMPT,
                &json!({
                    "input": input.text(),
                    "chart_name": chart_type.display_name(),
                    "auto": chart_type.is_auto(),
                    "plan": plan,
                    "existing_elements": serde_json::to_string_pretty(existing_elements)?,
                    "step_number": step_number,
                    "total_steps": total_steps,
                }),
            )?;
            vec![
                Message::system().with_text(PRESENTATION_SYSTEM_PROMPT),
                Message::user().with_text(content),
            ]
        }
    };
    Ok(messages)
}
