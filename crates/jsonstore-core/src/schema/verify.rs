use super::{
    app::{Field, FieldTy, Model, RelationClass},
    Result, Schema,
};
use crate::Error;

struct Verify<'a> {
    schema: &'a Schema,
}

impl Schema {
    pub(super) fn verify(&self) -> Result<()> {
        Verify { schema: self }.verify()
    }
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        for model in self.schema.app.models() {
            self.verify_primary_key(model)?;

            for field in &model.fields {
                self.verify_embedded_is_single_valued(field)?;
                self.verify_embedded_owner(field)?;
                self.verify_relation_targets(field)?;
                self.verify_order_by(field)?;
                self.verify_nested_is_embedded(field)?;
            }
        }

        Ok(())
    }

    /// Embedded collections, arrays and maps have no document layout.
    fn verify_embedded_is_single_valued(&self, field: &Field) -> Result<()> {
        match &field.ty {
            FieldTy::Embedded(embedded) if embedded.is_multi_valued() => {
                Err(Error::unsupported_feature(format!(
                    "embedded multi-valued field `{}` of type {}",
                    field.full_name(&self.schema.app),
                    field.declared_ty(&self.schema.app),
                )))
            }
            _ => Ok(()),
        }
    }

    fn verify_embedded_owner(&self, field: &Field) -> Result<()> {
        let FieldTy::Embedded(embedded) = &field.ty else {
            return Ok(());
        };
        let Some(owner_field) = &embedded.owner_field else {
            return Ok(());
        };

        let target = embedded.target(&self.schema.app);
        if target.field_by_name(owner_field).is_none() {
            return Err(Error::invalid_schema(format!(
                "`{}` names owner field `{owner_field}`, which `{}` does not declare",
                field.full_name(&self.schema.app),
                target.name
            )));
        }

        Ok(())
    }

    fn verify_relation_targets(&self, field: &Field) -> Result<()> {
        let FieldTy::Relation(relation) = &field.ty else {
            return Ok(());
        };

        for target in relation.targets() {
            let target = self.schema.app.model(target);
            if !target.is_root() {
                return Err(Error::invalid_schema(format!(
                    "relation `{}` targets `{}`, which is not a root model",
                    field.full_name(&self.schema.app),
                    target.name
                )));
            }
        }

        Ok(())
    }

    fn verify_order_by(&self, field: &Field) -> Result<()> {
        let Some(order_by) = &field.order_by else {
            return Ok(());
        };

        let target = match (&field.ty, field.relation_class()) {
            (FieldTy::Relation(relation), RelationClass::MultiValued) => relation.target(),
            _ => None,
        };

        let Some(target) = target else {
            return Err(Error::invalid_schema(format!(
                "`{}` declares an ordering but is not a collection or array relation",
                field.full_name(&self.schema.app)
            )));
        };

        let target = self.schema.app.model(target);
        for item in &order_by.items {
            if target.field_by_name(&item.field).is_none() {
                return Err(Error::invalid_schema(format!(
                    "`{}` orders by unknown field `{}::{}`",
                    field.full_name(&self.schema.app),
                    target.name,
                    item.field
                )));
            }
        }

        Ok(())
    }

    fn verify_nested_is_embedded(&self, field: &Field) -> Result<()> {
        if field.nested && !field.ty.is_embedded() {
            return Err(Error::invalid_schema(format!(
                "`{}` is marked nested but is not embedded",
                field.full_name(&self.schema.app)
            )));
        }
        Ok(())
    }

    fn verify_primary_key(&self, model: &Model) -> Result<()> {
        for field in model.primary_key_fields() {
            if !field.ty.is_primitive() || field.optional {
                return Err(Error::invalid_schema(format!(
                    "primary key field `{}` must be a non-optional primitive",
                    field.full_name(&self.schema.app)
                )));
            }
        }
        Ok(())
    }
}
