//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Every document in the hierarchy, keyed by its full slash path.
    ///
    /// `parent` and `collection_name` are derived from `path` on write so
    /// collection and collection-group scans can use plain indexes.
    documents (path) {
        /// Full document path, collated `"C"` so ordering is bytewise.
        path -> Text,
        /// Path of the containing collection.
        parent -> Text,
        /// Last segment of `parent`.
        collection_name -> Text,
        /// Last segment of `path`.
        doc_id -> Text,
        /// Document body.
        data -> Jsonb,
        /// Incremented on every write.
        version -> Int8,
        /// Timestamp of the last write.
        updated_at -> Timestamptz,
    }
}
