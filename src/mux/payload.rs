//! Per-destination payload construction.
//!
//! A directive without an override forwards the inbound body untouched,
//! so it is borrowed rather than cloned. An override is merged one level
//! deep: its keys replace the inbound ones, nested objects are replaced
//! wholesale, never merged.

use std::borrow::Cow;

use super::inbound::InboundPayload;
use crate::config::model::{MuxDirective, Override};

#[must_use]
pub fn build_payload<'a>(
    inbound: &'a InboundPayload,
    directive: &MuxDirective,
) -> Cow<'a, InboundPayload> {
    match &directive.overrides {
        None => Cow::Borrowed(inbound),
        Some(overrides) => Cow::Owned(merge_shallow(inbound, overrides)),
    }
}

/// `base` with every key of `overrides` written over it.
///
/// Colliding keys keep their position in `base`; new keys are appended.
#[must_use]
pub fn merge_shallow(base: &InboundPayload, overrides: &Override) -> InboundPayload {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
