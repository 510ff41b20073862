use super::{SIGNATURE_LABEL, SignatureParams};
use std::fmt::Write;

/// Serialise signature parameters into their structured-field value
///
/// This exact string doubles as the value of the `"@signature-params"` line of
/// the signature base, so every byte matters.
#[must_use]
pub fn signature_params_value(params: &SignatureParams<'_>) -> String {
    let mut buffer = String::from("(");
    for (idx, component) in params.components.iter().enumerate() {
        if idx > 0 {
            buffer.push(' ');
        }
        let _ = write!(buffer, "\"{component}\"");
    }
    buffer.push(')');

    let _ = write!(
        buffer,
        ";created={};keyid=\"{}\"",
        params.created, params.key_id
    );

    buffer
}

/// Serialise the `Signature-Input` header value
#[must_use]
pub fn signature_input_header(params: &SignatureParams<'_>) -> String {
    format!("{SIGNATURE_LABEL}={}", signature_params_value(params))
}

/// Serialise the `Signature` header value from a Base64-encoded signature
#[must_use]
pub fn signature_header(encoded_signature: &str) -> String {
    format!("{SIGNATURE_LABEL}=:{encoded_signature}:")
}

#[cfg(test)]
mod test {
    use crate::rfc9421::SignatureParams;

    #[test]
    fn wire_format() {
        let params = SignatureParams {
            components: vec!["@status", "content-digest"],
            created: 1_618_884_473,
            key_id: "test-key",
        };

        assert_eq!(
            super::signature_input_header(&params),
            r#"sig1=("@status" "content-digest");created=1618884473;keyid="test-key""#,
        );
        assert_eq!(super::signature_header("dGVzdA=="), "sig1=:dGVzdA==:");
    }

    #[test]
    fn empty_component_list() {
        let params = SignatureParams {
            components: vec![],
            created: 0,
            key_id: "k",
        };

        assert_eq!(
            super::signature_params_value(&params),
            r#"();created=0;keyid="k""#
        );
    }
}
