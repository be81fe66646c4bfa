use bson::{Bson, Document as Fields};
use std::sync::Arc;

/// An immutable, ordered field mapping. The atomic unit of data.
///
/// Records are cheap to clone (the field map is shared behind an `Arc`) and
/// never change after a collection is defined. Equality is by field values,
/// which is what the query union step dedupes on.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<Fields>,
}

impl Record {
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self { fields: Arc::new(fields) }
    }

    /// Raw field access. `Some(Bson::Null)` and `None` are distinct here;
    /// use [`Record::value_of`] when null and missing should read the same.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.fields.get(field)
    }

    /// Field access that treats an explicit null like a missing field,
    /// matching how condition evaluation sees records.
    #[must_use]
    pub fn value_of(&self, field: &str) -> Option<&Bson> {
        self.fields.get(field).filter(|v| !matches!(v, Bson::Null))
    }

    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl From<Fields> for Record {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}
