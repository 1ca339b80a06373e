mod document;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Document)]
// ============================================================================

/// Derive macro implementing `document_dao::Document` for a named-field struct.
///
/// The generated impl carries the collection name and an ordered field schema
/// consumed by the generic serializer.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize, Document)]
/// #[document(collection = "users")]
/// struct User {
///     name: String,
///     age: u32,
///     nickname: Option<String>,
///     #[document(ty = "map")]
///     address: Address,
///     #[serde(skip)]
///     #[document(skip)]
///     cached_greeting: String,
/// }
/// ```
///
/// Struct attributes:
/// - `collection = "..."`: defaults to the snake_case struct name plus `s`.
///
/// Field attributes:
/// - `skip`: not persisted (also implied by `#[serde(skip)]`).
/// - `ty = "string" | "integer" | "number" | "boolean" | "array" | "map" | "any"`:
///   overrides type inference.
/// - `optional`: the field may be absent from stored records.
///
/// `#[serde(rename = "...")]` and `#[serde(rename_all = "...")]` are honored
/// for stored field names.
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    document::derive_document(input)
}
