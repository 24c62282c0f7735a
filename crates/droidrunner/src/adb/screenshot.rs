//! Screen capture through `adb exec-out screencap`

use std::process::Output;
use tracing::{debug, warn};

use crate::bridge::{MemoryImage, RawImage};
use crate::error::{BridgeError, BridgeResult};

/// Turn the result of `screencap -p` into a frame.
///
/// Secure windows make screencap print `Status: -1` or produce nothing;
/// that is reported as no frame rather than as an error.
pub fn decode_screencap(output: &Output) -> BridgeResult<Option<MemoryImage>> {
    let stderr = String::from_utf8_lossy(&output.stderr);

    if stderr.contains("Status: -1") || stderr.contains("Failed") {
        warn!("screencap refused to capture: {}", stderr.trim());
        return Ok(None);
    }

    if !output.status.success() {
        return Err(BridgeError::CommandFailed(format!(
            "screencap failed: {}",
            stderr.trim()
        )));
    }

    if output.stdout.is_empty() {
        warn!("screencap returned an empty frame");
        return Ok(None);
    }

    let image = MemoryImage::decode(&output.stdout)?;
    debug!(
        "Captured {}x{} frame ({} bytes)",
        image.width(),
        image.height(),
        output.stdout.len()
    );
    Ok(Some(image))
}
