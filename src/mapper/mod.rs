//! Row-to-record mapping.
//!
//! A [`RowMapper`] is either derived from a [`Record`] descriptor or supplied as a
//! closure. Derived mappers are cached per record type in a [`MapperCache`].

mod cache;
mod record;

use std::fmt;
use std::sync::Arc;

use crate::error::SqlTemplateError;
use crate::results::Row;

pub use cache::MapperCache;
pub(crate) use record::decode_field;
pub use record::{
    FieldDescriptor, FieldKind, FieldValue, Record, RecordDescriptor, RecordFields,
};

type MapFn<T> = dyn Fn(&Row) -> Result<T, SqlTemplateError> + Send + Sync;

/// Converts one result row into a `T`. Cheap to clone.
pub struct RowMapper<T> {
    inner: Arc<MapFn<T>>,
}

impl<T> Clone for RowMapper<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for RowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMapper")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> RowMapper<T> {
    /// Wrap a caller-supplied mapping function.
    ///
    /// ```rust
    /// use sql_template::prelude::*;
    ///
    /// let mapper = RowMapper::new(|row: &Row| {
    ///     let account: String = row.try_get("account")?;
    ///     Ok(account.to_uppercase())
    /// });
    /// # let _ = mapper;
    /// ```
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Row) -> Result<T, SqlTemplateError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(func),
        }
    }

    /// Map one row.
    ///
    /// # Errors
    /// Propagates whatever the mapping function returns, normally `MappingError`.
    pub fn map_row(&self, row: &Row) -> Result<T, SqlTemplateError> {
        (self.inner)(row)
    }

    /// True when both handles share the same mapping function.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T: Record> RowMapper<T> {
    /// Derive a mapper from `T`'s descriptor. Prefer [`MapperCache::get_or_derive`],
    /// which runs this once per type.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::MappingError` if the descriptor is invalid.
    pub fn derived() -> Result<Self, SqlTemplateError> {
        let descriptor = Arc::new(T::descriptor());
        descriptor.validate()?;
        Ok(Self::new(move |row: &Row| {
            let mut fields = RecordFields::new(&descriptor, row);
            T::from_fields(&mut fields)
        }))
    }
}
