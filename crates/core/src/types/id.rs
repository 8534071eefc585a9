//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Backend records are
//! keyed by opaque strings, so the wrappers hold a `String`.

/// Generate a fresh random identifier (UUID v4, hyphenated).
#[must_use]
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `generate()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use stock_allocation_core::define_id;
/// define_id!(BatchId);
/// define_id!(ShelfId);
///
/// let batch_id = BatchId::new("b1");
/// let shelf_id = ShelfId::new("b1");
///
/// // These are different types, so this won't compile:
/// // let _: BatchId = shelf_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create a new random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::types::id::new_uuid())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(InvoiceId);
define_id!(InvoiceLineId);
define_id!(StockLineId);
define_id!(ItemId);
define_id!(LocationId);
define_id!(VvmStatusId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = InvoiceLineId::generate();
        let b = InvoiceLineId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = StockLineId::new("stock_line_a");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"stock_line_a\"");

        let back: StockLineId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
        assert_eq!(back.to_string(), "stock_line_a");
    }
}
