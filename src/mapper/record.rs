use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlTemplateError;
use crate::results::Row;
use crate::types::RowValues;

/// Value category a record field expects from its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
}

/// Rust types that can receive a column value.
///
/// `Option<T>` marks a nullable field; every other implementation rejects NULL.
pub trait FieldValue: Sized {
    const KIND: FieldKind;
    const NULLABLE: bool = false;

    /// Convert a non-NULL column value, or `None` if the value is incompatible.
    fn from_value(value: &RowValues) -> Option<Self>;

    /// Value used for a NULL column. `None` means NULL is rejected.
    fn from_null() -> Option<Self> {
        None
    }
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_int().copied()
    }
}

impl FieldValue for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_int().and_then(|v| i32::try_from(*v).ok())
    }
}

impl FieldValue for u32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_int().and_then(|v| u32::try_from(*v).ok())
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_float()
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_text().map(str::to_owned)
    }
}

impl FieldValue for NaiveDateTime {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_timestamp()
    }
}

impl FieldValue for JsonValue {
    const KIND: FieldKind = FieldKind::Json;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_json()
    }
}

impl FieldValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Blob;

    fn from_value(value: &RowValues) -> Option<Self> {
        value.as_blob().map(<[u8]>::to_vec)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_value(value: &RowValues) -> Option<Self> {
        T::from_value(value).map(Some)
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }
}

/// Decode one column into `F`, reporting problems against `field`.
pub(crate) fn decode_field<F: FieldValue>(
    field: &str,
    column: Option<&RowValues>,
) -> Result<F, SqlTemplateError> {
    match column {
        None => Err(SqlTemplateError::MappingError(format!(
            "no result column matches field `{field}`"
        ))),
        Some(RowValues::Null) => F::from_null().ok_or_else(|| {
            SqlTemplateError::MappingError(format!(
                "column `{field}` is NULL but the field is not nullable"
            ))
        }),
        Some(value) => F::from_value(value).ok_or_else(|| {
            SqlTemplateError::MappingError(format!(
                "column `{field}` holds a {} value, incompatible with a {:?} field",
                value.type_name(),
                F::KIND
            ))
        }),
    }
}

/// One field of a record: the column it reads and what it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    /// Describe a field reading column `name`. A raw identifier prefix (`r#type`) is
    /// dropped, since the column is plain `type`.
    #[must_use]
    pub fn of<F: FieldValue>(name: &str) -> Self {
        Self {
            name: name.strip_prefix("r#").unwrap_or(name).to_owned(),
            kind: F::KIND,
            nullable: F::NULLABLE,
        }
    }
}

/// Column-to-field table for a record type, in field declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    #[must_use]
    pub fn new(type_name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { type_name, fields }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Reject descriptors whose field names collide once case is ignored, since such
    /// fields could never be told apart by column name.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::MappingError` naming the duplicated field.
    pub fn validate(&self) -> Result<(), SqlTemplateError> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.to_lowercase()) {
                return Err(SqlTemplateError::MappingError(format!(
                    "record `{}` declares field `{}` more than once (names are case-insensitive)",
                    self.type_name, field.name
                )));
            }
        }
        Ok(())
    }
}

/// Cursor over a row's values in descriptor order, handed to [`Record::from_fields`].
pub struct RecordFields<'a> {
    descriptor: &'a RecordDescriptor,
    row: &'a Row,
    next: usize,
}

impl<'a> RecordFields<'a> {
    #[must_use]
    pub fn new(descriptor: &'a RecordDescriptor, row: &'a Row) -> Self {
        Self {
            descriptor,
            row,
            next: 0,
        }
    }

    /// Decode the next described field.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::MappingError` when the column is missing, NULL for a
    /// non-nullable field, incompatible, or when more fields are taken than described.
    pub fn take<F: FieldValue>(&mut self) -> Result<F, SqlTemplateError> {
        let field = self.descriptor.fields.get(self.next).ok_or_else(|| {
            SqlTemplateError::MappingError(format!(
                "record `{}` read more fields than its descriptor declares",
                self.descriptor.type_name
            ))
        })?;
        self.next += 1;
        decode_field(&field.name, self.row.get(&field.name))
    }
}

/// A type the template can build from a result row by column name.
///
/// Usually implemented through [`record!`](crate::record). A hand-written
/// implementation must take fields in the order its descriptor lists them:
/// ```rust
/// use sql_template::mapper::{FieldDescriptor, Record, RecordDescriptor, RecordFields};
/// use sql_template::SqlTemplateError;
///
/// struct Account {
///     id: i64,
///     email: Option<String>,
/// }
///
/// impl Record for Account {
///     fn descriptor() -> RecordDescriptor {
///         RecordDescriptor::new(
///             "Account",
///             vec![
///                 FieldDescriptor::of::<i64>("id"),
///                 FieldDescriptor::of::<Option<String>>("email"),
///             ],
///         )
///     }
///
///     fn from_fields(fields: &mut RecordFields<'_>) -> Result<Self, SqlTemplateError> {
///         Ok(Self {
///             id: fields.take()?,
///             email: fields.take()?,
///         })
///     }
/// }
/// ```
pub trait Record: Sized + Send + 'static {
    fn descriptor() -> RecordDescriptor;

    /// # Errors
    /// Returns `SqlTemplateError::MappingError` when a field cannot be decoded.
    fn from_fields(fields: &mut RecordFields<'_>) -> Result<Self, SqlTemplateError>;
}

/// Declare a struct and derive its [`Record`] implementation from the field list.
///
/// ```rust
/// sql_template::record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct User {
///         pub id: i64,
///         pub account: String,
///         pub email: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }

        impl $crate::mapper::Record for $name {
            fn descriptor() -> $crate::mapper::RecordDescriptor {
                $crate::mapper::RecordDescriptor::new(
                    ::std::stringify!($name),
                    ::std::vec![
                        $( $crate::mapper::FieldDescriptor::of::<$ty>(::std::stringify!($field)) ),*
                    ],
                )
            }

            fn from_fields(
                fields: &mut $crate::mapper::RecordFields<'_>,
            ) -> ::std::result::Result<Self, $crate::SqlTemplateError> {
                ::std::result::Result::Ok(Self {
                    $( $field: fields.take::<$ty>()?, )*
                })
            }
        }
    };
}
