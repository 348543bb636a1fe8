//! Built-in scoring rules.

pub mod build_result;
pub mod node_preference;
pub mod server_load;

pub use build_result::BuildResultRule;
pub use node_preference::NodePreferenceRule;
pub use server_load::ServerLoadRule;
