use bizsynth_llm_api::{GatewayError, InvokeParams, ModelGateway};
use bizsynth_types::{AgentOutput, ExecutionType, OrchestratorError, SynthesisResult, FALLBACK_SYNTHESIS_TEXT};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SynthesisMode;
use crate::prompt::synthesis_prompt;

/// Merges agent outputs into the final answer
pub struct Synthesizer {
    gateway: Arc<ModelGateway>,
    params: InvokeParams,
    timeout: Duration,
    mode: SynthesisMode,
}

impl Synthesizer {
    pub fn new(gateway: Arc<ModelGateway>, params: InvokeParams, timeout: Duration) -> Self {
        Self {
            gateway,
            params,
            timeout,
            mode: SynthesisMode::Model,
        }
    }

    pub fn with_mode(mut self, mode: SynthesisMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn synthesize(
        &self,
        outputs: &[AgentOutput],
        original_message: &str,
        execution_type: ExecutionType,
    ) -> Result<SynthesisResult, OrchestratorError> {
        let successes = sorted_successes(outputs);

        if successes.is_empty() {
            log::warn!("No successful agent output, returning fallback synthesis");
            return Ok(fallback_result(outputs, execution_type));
        }

        let (text, tokens_used) = match self.mode {
            SynthesisMode::Merge => (merge_outputs(&successes), 0),
            SynthesisMode::Model => {
                let prompt = synthesis_prompt(original_message, &successes);
                let completion = self
                    .gateway
                    .invoke(&prompt, self.params, self.timeout)
                    .await
                    .map_err(|e| match e {
                        GatewayError::Timeout(_) => OrchestratorError::from(e),
                        other => OrchestratorError::SynthesisFailed(other.to_string()),
                    })?;
                (completion.text, completion.tokens_used)
            }
        };

        Ok(SynthesisResult {
            text,
            source_outputs: outputs.to_vec(),
            execution_type,
            fallback: false,
            tokens_used,
        })
    }
}

/// Successful outputs ordered by agent id, then task id
fn sorted_successes(outputs: &[AgentOutput]) -> Vec<&AgentOutput> {
    let mut successes: Vec<&AgentOutput> = outputs.iter().filter(|o| o.success).collect();
    successes.sort_by(|a, b| a.agent_id.cmp(&b.agent_id).then_with(|| a.task_id.cmp(&b.task_id)));
    successes
}

/// Deterministic result used when nothing succeeded
pub fn fallback_result(outputs: &[AgentOutput], execution_type: ExecutionType) -> SynthesisResult {
    SynthesisResult {
        text: FALLBACK_SYNTHESIS_TEXT.to_string(),
        source_outputs: outputs.to_vec(),
        execution_type,
        fallback: true,
        tokens_used: 0,
    }
}

fn merge_outputs(successes: &[&AgentOutput]) -> String {
    let mut combined_content = String::new();
    for output in successes {
        combined_content.push_str(&format!(
            "### Result from {}\n\n{}\n\n",
            output.agent_id, output.output
        ));
    }
    combined_content.trim().to_string()
}
