// Case creation wizard steps, one module per screen
pub mod coverage;
pub mod customer_details;
pub mod declarations;
pub mod documents;
pub mod insurance_type;
pub mod issue;
pub mod property_details;
pub mod quote;
pub mod review;
pub mod vehicle_details;

// Shared modules
pub mod types;
pub mod utils;

// Re-export step implementations
pub use coverage::CoverageStep;
pub use customer_details::CustomerDetailsStep;
pub use declarations::DeclarationsStep;
pub use documents::DocumentsStep;
pub use insurance_type::InsuranceTypeStep;
pub use issue::IssueStep;
pub use property_details::PropertyDetailsStep;
pub use quote::QuoteStep;
pub use review::ReviewStep;
pub use vehicle_details::VehicleDetailsStep;

// Re-export session keys
pub use types::session_keys;
