//! # Descriptor Lookups
//!
//! Resolves the probed method and request message type inside the descriptors fetched
//! through reflection, and builds the default-valued request.
//!
//! Lookups are exact-name linear scans in declaration order; when a server advertises two
//! entries with the same name, the first one wins.
use crate::reflection::ResolvedService;
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor};

/// Returns the first item of `items` whose name equals `name`.
pub fn find_by_name<T, F>(items: impl IntoIterator<Item = T>, name: &str, name_of: F) -> Option<T>
where
    F: Fn(&T) -> &str,
{
    items.into_iter().find(|item| name_of(item) == name)
}

/// Finds `method` (short name, e.g. `Check`) in the resolved service.
pub fn resolve_method(resolved: &ResolvedService, method: &str) -> Option<MethodDescriptor> {
    find_by_name(resolved.service.methods(), method, |m| m.name())
}

/// Finds `message_type` (short name, e.g. `HealthCheckRequest`) among the top-level messages
/// declared in the file that contains the resolved service.
pub fn resolve_message_type(
    resolved: &ResolvedService,
    message_type: &str,
) -> Option<MessageDescriptor> {
    find_by_name(resolved.file.messages(), message_type, |m| m.name())
}

/// A message of type `descriptor` with every field unset.
pub fn build_default_message(descriptor: MessageDescriptor) -> DynamicMessage {
    DynamicMessage::new(descriptor)
}
