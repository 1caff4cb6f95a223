use serde::de::DeserializeOwned;
use serde::Serialize;

/// Represents an object able to be stored in a document collection.
///
/// A document serializes to a JSON object carrying a string `id` field. The
/// collection name is fixed per type so typed queries never need it spelled
/// out at the call site.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the collection holding documents of this type.
    const COLLECTION: &'static str;

    /// The document identifier.
    fn id(&self) -> &str;
}
