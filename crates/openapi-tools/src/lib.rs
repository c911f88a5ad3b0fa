//! `OpenAPI` -> mcpifier tool mapping conversion.
//!
//! `OpenAPI` 3.0 and 3.1 documents are supported, as are Swagger 2.0 documents.
//!
//! Every operation of a document becomes one [`ToolMapping`](mcpifier_rest_tools::ToolMapping):
//! a snake_case tool name, an input schema built from parameters and the JSON request body, an
//! optional output schema from the 200/201 JSON response, and the REST template that calls the
//! operation.

pub mod convert;
pub mod document;
pub mod error;
pub mod load;
pub mod naming;
pub mod resolver;

pub use convert::{Conversion, convert};
pub use document::{Document, SpecVersion};
pub use error::{OpenApiToolsError, Result};
pub use load::{DEFAULT_MAPPINGS_FILE, convert_to_file, load_spec, parse_spec, to_mappings_file};
