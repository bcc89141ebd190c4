use std::collections::HashMap;

/// Strips loader injection variables and pins the C locale so that the labels
/// in a utility's output are not translated.
pub fn sanitize_env(env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut sanitized = env.clone();
    sanitized.remove("LD_PRELOAD");
    sanitized.remove("DYLD_INSERT_LIBRARIES");
    sanitized.insert("LANG".to_string(), "C".to_string());
    sanitized.insert("LC_ALL".to_string(), "C".to_string());
    sanitized
}
