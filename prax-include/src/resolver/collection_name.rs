use smol_str::SmolStr;
use tracing::debug;

use crate::context::IncludeContext;
use crate::entity::EntitySchema;

impl IncludeContext {
    /// Physical collection name of an entity type.
    ///
    /// An explicit table annotation wins; otherwise the collection name
    /// convention in effect at first resolution decides. The result is cached
    /// and later convention changes do not affect it.
    pub fn collection_name(&self, schema: &EntitySchema) -> SmolStr {
        self.caches()
            .collection_names
            .get_or_insert_with(schema.type_id(), || {
                let name = match schema.table() {
                    Some(table) => SmolStr::new(table),
                    None => SmolStr::new(self.collection_name_convention().collection_name(schema)),
                };
                debug!(entity = schema.name(), collection = %name, "resolved collection name");
                name
            })
    }
}
