use tracing::{info, warn};

use crate::errors::CodeGenError;
use crate::prompt;
use crate::provider::Completer;
use crate::wire::EnhancedPrompt;

/// Rewrites a terse user prompt into a detailed one. A blank rewrite keeps
/// the original prompt.
pub async fn enhance_prompt(llm: &Completer, raw: &str) -> Result<String, CodeGenError> {
    let out: EnhancedPrompt = llm.invoke("enhance", &prompt::enhance(raw)).await?;
    let enhanced = out.enhanced_prompt.trim();
    if enhanced.is_empty() {
        warn!("enhancer returned an empty prompt; keeping the original");
        return Ok(raw.to_string());
    }
    info!(raw_chars = raw.len(), enhanced_chars = enhanced.len(), "prompt enhanced");
    Ok(enhanced.to_string())
}
