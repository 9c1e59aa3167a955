pub mod serializer;
#[allow(clippy::module_inception)]
pub mod value;

pub use serializer::to_value;
pub use value::Value;
