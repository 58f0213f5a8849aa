//! # Response Validation
//!
//! Compares a response against the expected text form configured for the probe.

use crate::error::ProbeError;
use prost_reflect::DynamicMessage;

/// The canonical text of a message: the compact, single-line Protobuf text format.
pub fn canonical_text(message: &DynamicMessage) -> String {
    message.to_string()
}

/// Accepts `response` when `expected` is empty or equal to its canonical text.
pub fn validate_response(response: &DynamicMessage, expected: &str) -> Result<(), ProbeError> {
    if expected.is_empty() {
        return Ok(());
    }

    let actual = canonical_text(response);
    if actual != expected {
        return Err(ProbeError::ResponseMismatch {
            actual,
            expected: expected.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::{DescriptorPool, Value};
    use prost_types::{
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
        field_descriptor_proto::{Label, Type},
    };

    fn reply(text: Option<&str>) -> DynamicMessage {
        let file = FileDescriptorProto {
            name: Some("reply.proto".to_string()),
            package: Some("reply".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Reply".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("message".to_string()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::String as i32),
                    json_name: Some("message".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let pool =
            DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
                .unwrap();

        let mut message = DynamicMessage::new(pool.get_message_by_name("reply.Reply").unwrap());
        if let Some(text) = text {
            message.set_field_by_name("message", Value::String(text.to_string()));
        }
        message
    }

    #[test]
    fn empty_expectation_accepts_anything() {
        assert!(validate_response(&reply(None), "").is_ok());
        assert!(validate_response(&reply(Some("whatever")), "").is_ok());
    }

    #[test]
    fn equal_text_is_accepted() {
        let response = reply(Some("pong"));
        let expected = canonical_text(&response);

        assert!(expected.contains("pong"));
        assert!(validate_response(&response, &expected).is_ok());
    }

    #[test]
    fn different_text_is_a_mismatch() {
        let response = reply(Some("pong"));
        let expected = canonical_text(&reply(Some("ping")));

        match validate_response(&response, &expected) {
            Err(ProbeError::ResponseMismatch { actual, expected: exp }) => {
                assert_eq!(actual, canonical_text(&response));
                assert_eq!(exp, expected);
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
    }

    #[test]
    fn default_response_has_empty_text() {
        let response = reply(None);

        assert_eq!(canonical_text(&response), "");
        assert!(matches!(
            validate_response(&response, "message:\"\""),
            Err(ProbeError::ResponseMismatch { .. })
        ));
    }
}
