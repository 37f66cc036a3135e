use crate::wire::{ChatPrompt, FormField};

pub const STYLESHEET_NAME: &str = "index.css";

pub fn system_prompt_enhance() -> String {
    "You are a helpful assistant designed to understand user prompts and enhance them to deliver \
optimal results in web development. If the user does not specify colors or styles, reference \
popular website themes and use them as inspiration to craft a refined and effective prompt."
        .to_string()
}

pub fn user_prompt_enhance(raw: &str) -> String {
    format!(
        "{raw}\n\nNote: If the user asks for a game-selling site without mentioning styles or colors, \
use popular websites like Epic Games or Steam as references."
    )
}

pub fn enhance(raw: &str) -> ChatPrompt {
    ChatPrompt { system: system_prompt_enhance(), user: user_prompt_enhance(raw) }
}

pub fn system_prompt_frontend() -> String {
    "You are a helpful assistant that creates HTML and CSS files.".to_string()
}

pub fn user_prompt_frontend(prompt: &str) -> String {
    format!(
        "{prompt}\n\nNote: The CSS file name should always be '{STYLESHEET_NAME}', and it should be \
linked in the HTML file."
    )
}

pub fn frontend(prompt: &str) -> ChatPrompt {
    ChatPrompt { system: system_prompt_frontend(), user: user_prompt_frontend(prompt) }
}

pub fn system_prompt_backend() -> String {
    "You are an API designer.".to_string()
}

/// Embeds the field list as JSON so names and types reach the model verbatim.
pub fn user_prompt_backend(fields: &[FormField]) -> String {
    let listed = serde_json::to_string(fields).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Given the following fields extracted from an HTML form:
{listed}
Suggest a REST API structure with CRUD operations using FastAPI.
Include model definitions, endpoints, and methods.
The Answer should be in str format. No preambles or comments.
It should be more realistic with real time scenarios.
It should be concise and solve the hard problems.

Note : The requirements.txt file will have contain the necessary libraries to run the API."#
    )
}

pub fn backend(fields: &[FormField]) -> ChatPrompt {
    ChatPrompt { system: system_prompt_backend(), user: user_prompt_backend(fields) }
}
