use thiserror::Error;

/// An error originating from a [`DataSource`](crate::source::DataSource).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The requested document does not exist
	#[error("The document `{0}` does not exist")]
	DocumentNotFound(String),

	/// The document being added already exists
	#[error("The document `{0}` already exists")]
	DocumentExists(String),

	/// The requested template does not exist
	#[error("The template `{0}` does not exist")]
	TemplateNotFound(String),

	/// No template could be determined for a document
	#[error("No template could be determined for the document `{0}`")]
	NoTemplateForDocument(String),

	/// The requested section does not exist
	#[error("The section `{0}` does not exist")]
	SectionNotFound(String),

	/// A stored template definition could not be interpreted
	#[error("The template `{name}` is not a valid template definition: {message}")]
	InvalidTemplate {
		name: String,
		message: String,
	},

	/// A stored document could not be interpreted
	#[error("The document `{path}` is malformed: {message}")]
	InvalidDocument {
		path: String,
		message: String,
	},

	/// There was a problem with the underlying storage
	#[error("There was a problem with the underlying data source: {0}")]
	Ds(String),

	/// There was an error when (de)serializing a value
	#[error("Serialization error: {0}")]
	Serde(#[from] serde_json::Error),
}

impl Error {
	/// Returns true when the error means the requested item is absent.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			Error::DocumentNotFound(_)
				| Error::TemplateNotFound(_)
				| Error::NoTemplateForDocument(_)
				| Error::SectionNotFound(_)
		)
	}
}
