use std::collections::HashMap;

use async_graphql::dynamic::Type;

use super::error::{GqlError, internal_error};

struct Entry {
	origin: String,
	ty: Option<Type>,
}

/// The build-once registry of named types for one schema build.
///
/// Every type is registered under a name together with an origin: a key
/// naming the content the type was derived from (a namespace, a field kind,
/// a section). The first request for a name reserves it and runs the
/// factory; later requests for the same name get the name back without
/// running the factory again, which also ends recursion through templates
/// that reference themselves. A request for a registered name from a
/// different origin fails, since the two shapes would silently merge.
#[derive(Default)]
pub struct TypeRegistry {
	entries: HashMap<String, Entry>,
	order: Vec<String>,
}

impl TypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn build<F>(
		&mut self,
		name: impl Into<String>,
		origin: impl Into<String>,
		factory: F,
	) -> Result<String, GqlError>
	where
		F: FnOnce(&mut Self) -> Result<Type, GqlError>,
	{
		let name = name.into();
		let origin = origin.into();
		if let Some(entry) = self.entries.get(&name) {
			if entry.origin != origin {
				return Err(GqlError::NameCollision {
					name,
					existing: entry.origin.clone(),
					requested: origin,
				});
			}
			return Ok(name);
		}
		trace!("Building type {name} from {origin}");
		self.entries.insert(
			name.clone(),
			Entry {
				origin,
				ty: None,
			},
		);
		self.order.push(name.clone());
		match factory(self) {
			Ok(ty) => {
				if let Some(entry) = self.entries.get_mut(&name) {
					entry.ty = Some(ty);
				}
				Ok(name)
			}
			Err(e) => {
				self.entries.remove(&name);
				self.order.retain(|n| n != &name);
				Err(e)
			}
		}
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The registered names, in registration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.order.iter().map(String::as_str)
	}

	/// Consumes the registry, returning every type in registration order.
	pub fn into_types(mut self) -> Result<Vec<Type>, GqlError> {
		let mut out = Vec::with_capacity(self.order.len());
		for name in self.order {
			match self.entries.remove(&name).and_then(|e| e.ty) {
				Some(ty) => out.push(ty),
				None => return Err(internal_error(format!("type `{name}` was never completed"))),
			}
		}
		Ok(out)
	}
}
