use std::sync::LazyLock;

/// The data key holding a document's body in Data, InitialValues and Input shapes.
pub const BODY_FIELD: &str = "_body";

/// The data key recording which template a document or block item was written with.
pub const TEMPLATE_FIELD: &str = "_template";

/// The name of the union over every document template.
pub const DOCUMENT_UNION: &str = "DocumentUnion";

/// The name of the tagged input accepted by the update mutation.
pub const DOCUMENT_INPUT: &str = "DocumentInput";

/// Specifies how deeply field groups may be nested inside a template before
/// the template is rejected.
pub static MAX_NESTING_DEPTH: LazyLock<usize> =
	lazy_env_parse!("CONTENTGRAPH_MAX_NESTING_DEPTH", usize, 16);

/// The maximum depth of a GraphQL query accepted by the generated schema.
pub static GRAPHQL_MAX_DEPTH: LazyLock<usize> =
	lazy_env_parse!("CONTENTGRAPH_GRAPHQL_MAX_DEPTH", usize, 64);

/// The maximum complexity of a GraphQL query accepted by the generated schema.
pub static GRAPHQL_MAX_COMPLEXITY: LazyLock<usize> =
	lazy_env_parse!("CONTENTGRAPH_GRAPHQL_MAX_COMPLEXITY", usize, 10_000);
