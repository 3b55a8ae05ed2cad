use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::tpl::FieldKind;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Data source error: {0}")]
	DbError(crate::err::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Invalid input: {0}")]
	InputError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("Error converting value: {val} to type: {target}")]
	TypeError {
		target: FieldKind,
		val: JsonValue,
	},
	#[error("The type name `{name}` is generated by both `{existing}` and `{requested}`")]
	NameCollision {
		name: String,
		existing: String,
		requested: String,
	},
}

impl GqlError {
	/// The `code` extension reported with a field error.
	pub fn code(&self) -> &'static str {
		match self {
			GqlError::DbError(e) if e.is_not_found() => "NOT_FOUND",
			GqlError::DbError(_) => "DATA_SOURCE_ERROR",
			GqlError::SchemaError(_) => "SCHEMA_ERROR",
			GqlError::ResolverError(_) => "RESOLVER_ERROR",
			GqlError::InputError(_) => "BAD_USER_INPUT",
			GqlError::InternalError(_) => "INTERNAL_SERVER_ERROR",
			GqlError::TypeError {
				..
			} => "INVALID_STORED_VALUE",
			GqlError::NameCollision {
				..
			} => "NAME_COLLISION",
		}
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn input_error(msg: impl Into<String>) -> GqlError {
	GqlError::InputError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

pub fn type_error(kind: FieldKind, val: &JsonValue) -> GqlError {
	GqlError::TypeError {
		target: kind,
		val: val.to_owned(),
	}
}

impl From<crate::err::Error> for GqlError {
	fn from(value: crate::err::Error) -> Self {
		GqlError::DbError(value)
	}
}
