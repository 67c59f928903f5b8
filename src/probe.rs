use crate::{
    client::{AssessmentClient, Capacity},
    error::FatalError,
};
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Confirms the service is reachable and has a free assessment slot.
pub fn check_capacity(
    client: &dyn AssessmentClient,
    concurrency: usize,
    cooldown: Duration,
) -> Result<Capacity> {
    let capacity = client
        .probe_capacity()
        .map_err(|e| FatalError::ServiceUnavailable(e.to_string()))?;

    info!(
        "service capacity max={} current={} cool_off={:?}",
        capacity.max_assessments, capacity.current_assessments, capacity.cool_off
    );

    if capacity.available() == 0 {
        return Err(FatalError::ServiceUnavailable(format!(
            "maximum concurrent assessments exceeded ({}/{})",
            capacity.current_assessments, capacity.max_assessments
        ))
        .into());
    }

    if (capacity.available() as usize) < concurrency {
        warn!(
            "concurrency {} exceeds free assessment slots ({})",
            concurrency,
            capacity.available()
        );
    }
    if capacity.cool_off > cooldown {
        warn!(
            "configured cooldown {:?} is shorter than the service cool-off {:?}",
            cooldown, capacity.cool_off
        );
    }

    Ok(capacity)
}
