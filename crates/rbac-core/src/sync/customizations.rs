//! Customizations phase: the access-token claims script

use similar::TextDiff;

use rbac_model::DesiredState;

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::report::{EntityKind, OperationAction};

const TARGET: &str = "custom-jwt-claims";

/// Line endings to `\n`, surrounding whitespace trimmed.
pub fn normalize_script(script: &str) -> String {
    script
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

pub(crate) async fn sync_customizations(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
) -> Result<()> {
    let Some(claims) = desired.enabled_jwt_claims() else {
        return Ok(());
    };
    let client = ctx.client;

    let path = ctx.options.resolve_path(&claims.script_path);
    let local = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| Error::Script {
            path: path.clone(),
            source,
        })?;

    let remote = client
        .get_access_token_claims_script()
        .await
        .map_err(Error::fetch("access-token claims script"))?;

    let local_normalized = normalize_script(&local);
    let remote_normalized = remote.as_deref().map(normalize_script).unwrap_or_default();
    if local_normalized == remote_normalized {
        tracing::debug!(path = %path.display(), "Claims script up to date");
        return Ok(());
    }

    let diff = TextDiff::from_lines(remote_normalized.as_str(), local_normalized.as_str());
    let mut unified = diff.unified_diff();
    tracing::debug!(
        "Claims script diff:\n{}",
        unified.header("remote", "local")
    );

    let op = PendingOp::new(
        EntityKind::Customization,
        OperationAction::Update,
        TARGET,
        format!("Updated access-token claims script from {}", path.display()),
    );
    let outcome = client.put_access_token_claims_script(&local).await;
    ctx.record(op, FailureMode::Abort, outcome)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_script("a\r\nb\rc\n\n"), "a\nb\nc");
        assert_eq!(normalize_script("  exports.x = 1;  "), "exports.x = 1;");
    }
}
