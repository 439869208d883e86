use serde::Deserialize;

/// JSON body accepted by POST /convert as a liveness probe. A truthy
/// `test` flag short-circuits the handler before any filesystem or
/// subprocess work happens.
#[derive(Debug, Deserialize)]
pub struct LivenessProbe {
    #[serde(default)]
    pub test: bool,
}
