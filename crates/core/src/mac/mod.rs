/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
///
/// # Parameters
///
/// - `$key`: An expression representing the name of the environment variable.
/// - `$t`: The type of the value to be parsed.
/// - `$default`: The default value to fall back to if the environment variable is not set or
///   parsing fails.
///
/// # Return Value
///
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With no default specified
	($key:expr, Option<String>) => {
		std::sync::LazyLock::new(|| std::env::var($key).ok())
	};
	// With no default specified
	($key:expr, $t:ty) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_default()
		})
	};
	// With a closure for the default value
	($key:expr, $t:ty, || $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	// With a static expression for the default value
	($key:expr, $t:ty, $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

#[cfg(test)]
mod test {
	use std::sync::LazyLock;

	#[test]
	fn lazy_env_parse_falls_back_to_default() {
		static VALUE: LazyLock<usize> =
			lazy_env_parse!("CONTENTGRAPH_TEST_UNSET_VARIABLE_FOR_MACRO", usize, 42);
		assert_eq!(*VALUE, 42);
	}

	#[test]
	fn lazy_env_parse_without_default() {
		static VALUE: LazyLock<Option<String>> =
			lazy_env_parse!("CONTENTGRAPH_TEST_UNSET_VARIABLE_FOR_MACRO", Option<String>);
		assert!(VALUE.is_none());
	}
}
