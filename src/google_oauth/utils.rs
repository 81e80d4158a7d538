use base64::Engine;
use serde_json::Value;

/// Copy the `email` claim of the id token into the token payload, if any.
pub fn attach_email_from_id_token(token_value: &mut Value) {
    let Some(id_token) = token_value.get("id_token").and_then(|v| v.as_str()) else {
        return;
    };
    let Some(payload_b64) = id_token.split('.').nth(1) else {
        return;
    };
    let Some(decoded) = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .ok()
    else {
        return;
    };
    let Ok(payload_json) = serde_json::from_slice::<Value>(&decoded) else {
        return;
    };
    let Some(email) = payload_json.get("email").and_then(|e| e.as_str()) else {
        return;
    };
    if let Some(obj) = token_value.as_object_mut() {
        obj.insert("email".to_string(), Value::String(email.to_string()));
    }
}
