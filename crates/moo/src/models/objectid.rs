use uuid::Uuid;

/// Mint an opaque id such as `call_3f2a...`, used when a provider omits tool call ids.
pub fn create_object_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
