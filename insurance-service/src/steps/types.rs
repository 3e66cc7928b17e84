/// Context keys shared by the wizard steps and the HTTP layer.
pub mod session_keys {
    /// The fields of the current form submission, set by the handler before
    /// each step runs.
    pub const FORM: &str = "form";
    /// Set by the handler when the client pressed the back button; consumed
    /// by whichever step runs next.
    pub const NAV_BACK: &str = "nav_back";

    pub const CUSTOMER: &str = "customer";
    pub const INSURANCE_TYPE: &str = "insurance_type";
    pub const VEHICLE_DETAILS: &str = "vehicle_details";
    pub const PROPERTY_DETAILS: &str = "property_details";
    pub const COVERAGE: &str = "coverage";
    pub const QUOTE: &str = "quote";
    pub const DOCUMENTS: &str = "documents";
    pub const ISSUED_CASE: &str = "issued_case";
}

/// Insurance type values accepted on step 2.
pub const INSURANCE_TYPE_VEHICLE: &str = "vehicle";
pub const INSURANCE_TYPE_PROPERTY: &str = "property";
