use crate::{IdentityCodec, Reconstructors};
use jsonstore_core::{Converters, Orchestrator, Schema};

/// Everything a marshalling pass needs besides the object and the document.
///
/// The registries are passed in explicitly; nothing is looked up from global
/// state.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub schema: &'a Schema,
    pub converters: &'a Converters,
    pub reconstructors: &'a Reconstructors,
    pub identities: &'a IdentityCodec,
    pub orchestrator: &'a dyn Orchestrator,
}
