pub mod config;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod search;

pub use domain::criteria::{Criteria, Scalar};
pub use domain::filters::FilterSet;
pub use domain::intent::{Intent, IntentAction};
pub use domain::vehicle::{Vehicle, VehicleRecord};
pub use errors::{ApplicationError, CoercionError, FormatError};
pub use search::{compile, format_results, Compilation, DeterministicFilterCompiler, FilterCompiler};
