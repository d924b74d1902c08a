//! Host calls with operation context attached.
//!
//! State-changing operations go through [`call`] and friends and propagate
//! failures; read-only enumerations go through [`enumerate`], which turns any
//! host failure into an empty list.

use crate::error::{Result, SceneError};
use scenelink_host::{HostCommand, HostValue, Invocation};

pub(crate) fn call(
    host: &dyn HostCommand,
    operation: &'static str,
    target: &str,
    invocation: Invocation,
) -> Result<HostValue> {
    tracing::trace!(operation, target, invocation = %invocation, "host call");
    host.invoke(&invocation)
        .map_err(|source| SceneError::HostOperationFailed {
            operation,
            target: target.to_string(),
            source,
        })
}

pub(crate) fn call_string(
    host: &dyn HostCommand,
    operation: &'static str,
    target: &str,
    invocation: Invocation,
) -> Result<String> {
    match call(host, operation, target, invocation)? {
        HostValue::Str(s) => Ok(s),
        HostValue::Null => Ok(String::new()),
        other => Err(SceneError::UnexpectedResult {
            operation,
            found: other.kind(),
        }),
    }
}

pub(crate) fn call_bool(
    host: &dyn HostCommand,
    operation: &'static str,
    target: &str,
    invocation: Invocation,
) -> Result<bool> {
    let value = call(host, operation, target, invocation)?;
    value.as_bool().ok_or(SceneError::UnexpectedResult {
        operation,
        found: value.kind(),
    })
}

pub(crate) fn call_list(
    host: &dyn HostCommand,
    operation: &'static str,
    target: &str,
    invocation: Invocation,
) -> Result<Vec<String>> {
    let value = call(host, operation, target, invocation)?;
    let found = value.kind();
    value
        .into_list()
        .ok_or(SceneError::UnexpectedResult { operation, found })
}

pub(crate) fn enumerate(
    host: &dyn HostCommand,
    operation: &'static str,
    target: &str,
    invocation: Invocation,
) -> Vec<String> {
    match call_list(host, operation, target, invocation) {
        Ok(items) => items,
        Err(err) => {
            tracing::debug!(operation, target, error = %err, "enumeration degraded to empty");
            Vec::new()
        }
    }
}
