//! # Spec Views
//!
//! Every typed spec flattens itself into a [`SpecView`]: identifiers for the
//! remote key, patchable/immutable fields keyed by patch path, unresolved
//! references, and user tags.

use crate::crd::ResourceReference;
use crate::descriptor::{FieldMap, FieldValue, Identifiers, Kind};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("`{raw}` and `{reference}` are mutually exclusive")]
    ConflictingReference {
        raw: &'static str,
        reference: &'static str,
    },

    #[error("invalid `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecView {
    pub identifiers: Identifiers,
    pub fields: FieldMap,
    /// Reference field name → declared reference, resolved later
    pub references: Vec<(&'static str, ResourceReference)>,
    pub tags: BTreeMap<String, String>,
}

impl SpecView {
    pub fn identifier(&mut self, name: &str, value: &str) {
        self.identifiers.insert(name.to_string(), value.to_string());
    }

    pub fn field<V: Into<FieldValue>>(&mut self, path: &str, value: Option<V>) {
        crate::descriptor::put(&mut self.fields, path, value);
    }

    /// Record either a raw identifier or a reference that will resolve into it
    pub fn identifier_or_ref(
        &mut self,
        name: &'static str,
        raw: Option<&String>,
        ref_name: &'static str,
        reference: Option<&ResourceReference>,
    ) -> Result<(), SpecError> {
        match (raw, reference) {
            (Some(_), Some(_)) => Err(SpecError::ConflictingReference {
                raw: name,
                reference: ref_name,
            }),
            (Some(value), None) => {
                self.identifier(name, value);
                Ok(())
            }
            (None, Some(reference)) => {
                self.references.push((ref_name, reference.clone()));
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    /// Record either a raw field value or a reference that will resolve into it
    pub fn field_or_ref(
        &mut self,
        path: &'static str,
        raw: Option<&String>,
        ref_name: &'static str,
        reference: Option<&ResourceReference>,
    ) -> Result<(), SpecError> {
        match (raw, reference) {
            (Some(_), Some(_)) => Err(SpecError::ConflictingReference {
                raw: path,
                reference: ref_name,
            }),
            (raw, reference) => {
                self.field(path, raw.cloned());
                if let Some(reference) = reference {
                    self.references.push((ref_name, reference.clone()));
                }
                Ok(())
            }
        }
    }

    pub fn tags(&mut self, tags: Option<&BTreeMap<String, String>>) {
        if let Some(tags) = tags {
            self.tags.clone_from(tags);
        }
    }
}

/// Typed spec of one API Gateway kind
pub trait SpecFields {
    const KIND: Kind;

    /// Flatten the spec, validating shape constraints the remote API enforces on update
    fn view(&self) -> Result<SpecView, SpecError>;
}
