use super::ModelId;
use crate::Type;

/// A field referencing one or more other persistent objects by identity.
#[derive(Debug, Clone)]
pub enum Relation {
    /// One-to-one or many-to-one
    One(ModelId),

    Collection(ModelId),

    Array(ModelId),

    /// Each side is either a persistent object or a plain value
    Map { key: MapSide, value: MapSide },
}

#[derive(Debug, Clone)]
pub enum MapSide {
    Model(ModelId),
    Value(Type),
}

/// Coarse relation classification driving which marshalling branch applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationClass {
    None,
    SingleValued,
    MultiValued,
}

impl Relation {
    pub fn class(&self) -> RelationClass {
        match self {
            Relation::One(_) => RelationClass::SingleValued,
            _ => RelationClass::MultiValued,
        }
    }

    /// The related model of a single-valued, collection or array relation.
    pub fn target(&self) -> Option<ModelId> {
        match self {
            Relation::One(target) | Relation::Collection(target) | Relation::Array(target) => {
                Some(*target)
            }
            Relation::Map { .. } => None,
        }
    }

    /// Every model this relation can reference.
    pub fn targets(&self) -> Vec<ModelId> {
        match self {
            Relation::Map { key, value } => [key, value]
                .into_iter()
                .filter_map(MapSide::as_model)
                .collect(),
            relation => relation.target().into_iter().collect(),
        }
    }
}

impl MapSide {
    pub fn as_model(&self) -> Option<ModelId> {
        match self {
            MapSide::Model(id) => Some(*id),
            MapSide::Value(_) => None,
        }
    }
}

impl From<ModelId> for MapSide {
    fn from(value: ModelId) -> Self {
        MapSide::Model(value)
    }
}

impl From<Type> for MapSide {
    fn from(value: Type) -> Self {
        MapSide::Value(value)
    }
}
