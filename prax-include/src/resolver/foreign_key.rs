use tracing::debug;

use crate::context::IncludeContext;
use crate::entity::Member;
use crate::error::IncludeResult;

use super::property_or_field;

impl IncludeContext {
    /// Member of the navigation's declaring type named by the foreign key
    /// convention, if one exists.
    ///
    /// Both outcomes are cached, including "no such member".
    pub fn foreign_key(&self, navigation: &Member) -> IncludeResult<Option<Member>> {
        navigation.ensure_field_or_property()?;
        navigation.ensure_custom_type()?;

        self.caches()
            .foreign_keys
            .get_or_try_insert_with(navigation.key(), || {
                let name = self.foreign_key_convention().foreign_key_name(navigation)?;
                let member = property_or_field(navigation.declaring_type(), &name);
                debug!(
                    navigation = %navigation,
                    expected = %name,
                    found = member.is_some(),
                    "applied foreign key convention"
                );
                Ok(member)
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::context::IncludeContext;
    use crate::conventions::ForeignKeyNaming;
    use crate::entity::{Entity, EntitySchema, MemberInfo, ValueType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Author;

    #[derive(Debug, Serialize, Deserialize)]
    struct Book;

    crate::entity!(
        Author,
        EntitySchema::builder::<Author>("Author")
            .id(MemberInfo::property("AuthorId", ValueType::scalar("ObjectId")).element("_id"))
            .build()
    );

    crate::entity!(
        Book,
        EntitySchema::builder::<Book>("Book")
            .id(MemberInfo::property("Id", ValueType::scalar("ObjectId")).element("_id"))
            .member(MemberInfo::property("Writer_AuthorId", ValueType::scalar("ObjectId")))
            .member(MemberInfo::property("Writer", ValueType::entity::<Author>()))
            .member(MemberInfo::property("Editor", ValueType::entity::<Author>()))
            .member(MemberInfo::method("Editor_AuthorId", ValueType::scalar("ObjectId")))
            .member(MemberInfo::property("Title", ValueType::scalar("String")))
            .build()
    );

    #[test]
    fn test_convention_match() {
        let context = IncludeContext::default();
        let writer = Book::schema().member("Writer").unwrap();
        let key = context.foreign_key(&writer).unwrap().unwrap();
        assert_eq!(key.name(), "Writer_AuthorId");
    }

    #[test]
    fn test_methods_are_not_keys() {
        let context = IncludeContext::default();
        let editor = Book::schema().member("Editor").unwrap();
        assert!(context.foreign_key(&editor).unwrap().is_none());
    }

    #[test]
    fn test_absence_is_cached() {
        let context = IncludeContext::default();
        context.set_foreign_key_convention(ForeignKeyNaming::NavigationNameIdName);
        let writer = Book::schema().member("Writer").unwrap();
        assert!(context.foreign_key(&writer).unwrap().is_none());

        context.set_foreign_key_convention(ForeignKeyNaming::NavigationNameUnderscoreIdName);
        assert!(context.foreign_key(&writer).unwrap().is_none());
    }

    #[test]
    fn test_scalar_member_rejected() {
        let context = IncludeContext::default();
        let title = Book::schema().member("Title").unwrap();
        assert!(context.foreign_key(&title).unwrap_err().is_invalid_member());
    }
}
