// ── App manifest ──
//
// The manifest is an opaque JSON document shipped with the adapter. The
// router only reads it and, for `manifest_state` requests, attaches the
// current lifecycle and settings.

use std::path::Path;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::CoreError;
use crate::lifecycle::Lifecycle;
use crate::ports::AdapterSettings;

/// Mode value asking for the manifest plus current state.
pub const MANIFEST_STATE: &str = "manifest_state";

pub fn load_manifest(path: &Path) -> Result<Value, CoreError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
        message: format!("cannot read manifest {}: {e}", path.display()),
    })?;
    let manifest: Value = serde_json::from_str(&raw).map_err(|e| CoreError::Config {
        message: format!("invalid manifest {}: {e}", path.display()),
    })?;
    if !manifest.is_object() {
        return Err(CoreError::Config {
            message: format!("manifest {} is not a JSON object", path.display()),
        });
    }
    debug!(path = %path.display(), "manifest loaded");
    Ok(manifest)
}

/// Attach `app_state` and `config_state` to a loaded manifest.
pub fn with_state(mut manifest: Value, lifecycle: &Lifecycle, settings: &AdapterSettings) -> Value {
    if let Some(obj) = manifest.as_object_mut() {
        obj.insert("app_state".into(), json!(lifecycle));
        obj.insert("config_state".into(), json!(settings));
    }
    manifest
}
