use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A single field of a template, discriminated by its `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Field {
	Text(TextField),
	Textarea(TextareaField),
	Select(SelectField),
	Boolean(BooleanField),
	Datetime(DatetimeField),
	Number(NumberField),
	File(FileField),
	ImageGallery(ImageGalleryField),
	TagList(TagListField),
	List(ListField),
	FieldGroup(GroupField),
	FieldGroupList(GroupListField),
	Blocks(BlocksField),
}

/// The kind of a [`Field`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
	Text,
	Textarea,
	Select,
	Boolean,
	Datetime,
	Number,
	File,
	ImageGallery,
	TagList,
	List,
	FieldGroup,
	FieldGroupList,
	Blocks,
}

impl FieldKind {
	/// The editing component announced to form renderers.
	pub fn component(&self) -> &'static str {
		match self {
			FieldKind::Text => "text",
			FieldKind::Textarea => "textarea",
			FieldKind::Select => "select",
			FieldKind::Boolean => "toggle",
			FieldKind::Datetime => "date",
			FieldKind::Number => "number",
			FieldKind::File => "image",
			FieldKind::ImageGallery => "gallery",
			FieldKind::TagList => "tags",
			FieldKind::List => "list",
			FieldKind::FieldGroup => "group",
			FieldKind::FieldGroupList => "group-list",
			FieldKind::Blocks => "blocks",
		}
	}
}

impl Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			FieldKind::Text => "text",
			FieldKind::Textarea => "textarea",
			FieldKind::Select => "select",
			FieldKind::Boolean => "boolean",
			FieldKind::Datetime => "datetime",
			FieldKind::Number => "number",
			FieldKind::File => "file",
			FieldKind::ImageGallery => "image_gallery",
			FieldKind::TagList => "tag_list",
			FieldKind::List => "list",
			FieldKind::FieldGroup => "field_group",
			FieldKind::FieldGroupList => "field_group_list",
			FieldKind::Blocks => "blocks",
		};
		f.write_str(name)
	}
}

macro_rules! impl_common {
	($($ty:ident => $kind:ident),+ $(,)?) => {
		$(
			impl $ty {
				pub fn label(&self) -> &str {
					self.label.as_deref().unwrap_or(&self.name)
				}
				pub fn kind(&self) -> FieldKind {
					FieldKind::$kind
				}
			}
		)+
	};
}

impl_common! {
	TextField => Text,
	TextareaField => Textarea,
	SelectField => Select,
	BooleanField => Boolean,
	DatetimeField => Datetime,
	NumberField => Number,
	FileField => File,
	ImageGalleryField => ImageGallery,
	TagListField => TagList,
	ListField => List,
	GroupField => FieldGroup,
	GroupListField => FieldGroupList,
	BlocksField => Blocks,
}

impl Field {
	pub fn name(&self) -> &str {
		match self {
			Field::Text(f) => &f.name,
			Field::Textarea(f) => &f.name,
			Field::Select(f) => &f.name,
			Field::Boolean(f) => &f.name,
			Field::Datetime(f) => &f.name,
			Field::Number(f) => &f.name,
			Field::File(f) => &f.name,
			Field::ImageGallery(f) => &f.name,
			Field::TagList(f) => &f.name,
			Field::List(f) => &f.name,
			Field::FieldGroup(f) => &f.name,
			Field::FieldGroupList(f) => &f.name,
			Field::Blocks(f) => &f.name,
		}
	}

	pub fn label(&self) -> &str {
		match self {
			Field::Text(f) => f.label(),
			Field::Textarea(f) => f.label(),
			Field::Select(f) => f.label(),
			Field::Boolean(f) => f.label(),
			Field::Datetime(f) => f.label(),
			Field::Number(f) => f.label(),
			Field::File(f) => f.label(),
			Field::ImageGallery(f) => f.label(),
			Field::TagList(f) => f.label(),
			Field::List(f) => f.label(),
			Field::FieldGroup(f) => f.label(),
			Field::FieldGroupList(f) => f.label(),
			Field::Blocks(f) => f.label(),
		}
	}

	pub fn kind(&self) -> FieldKind {
		match self {
			Field::Text(_) => FieldKind::Text,
			Field::Textarea(_) => FieldKind::Textarea,
			Field::Select(_) => FieldKind::Select,
			Field::Boolean(_) => FieldKind::Boolean,
			Field::Datetime(_) => FieldKind::Datetime,
			Field::Number(_) => FieldKind::Number,
			Field::File(_) => FieldKind::File,
			Field::ImageGallery(_) => FieldKind::ImageGallery,
			Field::TagList(_) => FieldKind::TagList,
			Field::List(_) => FieldKind::List,
			Field::FieldGroup(_) => FieldKind::FieldGroup,
			Field::FieldGroupList(_) => FieldKind::FieldGroupList,
			Field::Blocks(_) => FieldKind::Blocks,
		}
	}

	/// Assigns namespaces to this field and every group nested below it.
	pub(crate) fn assign_namespace(&mut self, parent: &[String]) {
		let child = |name: &str| {
			let mut ns = parent.to_vec();
			ns.push(name.to_owned());
			ns
		};
		match self {
			Field::FieldGroup(f) => {
				f.namespace = child(&f.name);
				for field in f.fields.iter_mut() {
					field.assign_namespace(&f.namespace);
				}
			}
			Field::FieldGroupList(f) => {
				f.namespace = child(&f.name);
				for field in f.fields.iter_mut() {
					field.assign_namespace(&f.namespace);
				}
			}
			Field::Blocks(f) => {
				f.namespace = child(&f.name);
			}
			_ => {}
		}
	}

	/// Creates the implicit body field appended to every top-level template.
	pub fn body() -> Self {
		Field::Textarea(TextareaField {
			name: crate::cnf::BODY_FIELD.to_owned(),
			label: Some("Body".to_owned()),
			config: Default::default(),
		})
	}
}

/// Configuration shared by the field kinds without options of their own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
	pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextareaField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BooleanField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageGalleryField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagListField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: FieldConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatetimeConfig {
	pub required: bool,
	pub date_format: Option<String>,
	pub time_format: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatetimeField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: DatetimeConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberConfig {
	pub required: bool,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub step: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumberField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: NumberConfig,
}

/// Where the values of a select or list field come from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
	/// A fixed list of options stored as plain strings.
	#[default]
	Simple,
	/// References to the documents of a section.
	Pages {
		section: String,
	},
	/// References to an explicit list of documents.
	Documents {
		#[serde(default)]
		paths: Vec<String>,
	},
}

impl Source {
	pub fn is_reference(&self) -> bool {
		!matches!(self, Source::Simple)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
	pub required: bool,
	pub options: Vec<String>,
	pub source: Source,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: OptionsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub config: OptionsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub fields: Vec<Field>,
	#[serde(skip)]
	pub namespace: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupListField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub fields: Vec<Field>,
	#[serde(skip)]
	pub namespace: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlocksField {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub template_types: Vec<String>,
	#[serde(skip)]
	pub namespace: Vec<String>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn deserialize_select_with_section_source() {
		let field: Field = serde_json::from_value(json!({
			"type": "select",
			"name": "author",
			"config": { "source": { "type": "pages", "section": "authors" } }
		}))
		.unwrap();
		let Field::Select(select) = field else {
			panic!("expected a select field");
		};
		assert_eq!(
			select.config.source,
			Source::Pages {
				section: "authors".to_owned()
			}
		);
		assert_eq!(select.label(), "author");
	}

	#[test]
	fn deserialize_defaults_to_simple_source() {
		let field: Field = serde_json::from_value(json!({
			"type": "list",
			"name": "tags",
			"label": "Tags",
			"config": { "options": ["a", "b"] }
		}))
		.unwrap();
		let Field::List(list) = field else {
			panic!("expected a list field");
		};
		assert_eq!(list.config.source, Source::Simple);
		assert_eq!(list.config.options, vec!["a", "b"]);
	}

	#[test]
	fn unknown_field_kind_is_rejected() {
		let res = serde_json::from_value::<Field>(json!({ "type": "color", "name": "c" }));
		assert!(res.is_err());
	}

	#[test]
	fn kinds_and_components() {
		let field = Field::body();
		assert_eq!(field.kind(), FieldKind::Textarea);
		assert_eq!(field.kind().component(), "textarea");
		assert_eq!(field.name(), "_body");
		assert_eq!(FieldKind::FieldGroupList.to_string(), "field_group_list");
	}
}
