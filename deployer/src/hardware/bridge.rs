//! Bridge offloading validation

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;

/// Switch families able to hardware-offload more than one bridge
const MULTI_BRIDGE_MODELS: &str = r"CRS[35]\d\d";

/// Verdict for a requested bridge layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeValidation {
    pub valid: bool,
    pub error: Option<String>,
}

/// Check that `model` can offload `bridge_count` bridges in hardware.
///
/// Only the CRS3xx and CRS5xx switch families offload several bridges; on any
/// other model traffic on the secondary bridges falls back to the CPU.
pub fn validate_bridge_config(model: &str, bridge_count: usize) -> Result<BridgeValidation, DeployerError> {
    let model = model.trim().to_uppercase();
    let pattern = Regex::new(MULTI_BRIDGE_MODELS)
        .map_err(|e| DeployerError::Internal(format!("invalid model pattern: {}", e)))?;

    if bridge_count > 1 && !pattern.is_match(&model) {
        return Ok(BridgeValidation {
            valid: false,
            error: Some(format!(
                "PERFORMANCE WARNING: The device '{}' generally supports only ONE \
                 hardware-offloaded bridge. You are attempting to create {}. \
                 Traffic on secondary bridges will hit the CPU, causing bottlenecks.",
                model, bridge_count
            )),
        });
    }

    Ok(BridgeValidation {
        valid: true,
        error: None,
    })
}
