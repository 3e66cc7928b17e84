//! Domain records shared across the service. These are plain serde structs
//! with string ids; referential links (claim -> policy -> user, case -> agent)
//! are by id and degrade to an "Unknown" label when the target is missing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatus {
    Active,
    Pending,
    Expired,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStatus::Active => write!(f, "Active"),
            PolicyStatus::Pending => write!(f, "Pending"),
            PolicyStatus::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(PolicyStatus::Active),
            "pending" => Ok(PolicyStatus::Pending),
            "expired" => Ok(PolicyStatus::Expired),
            other => Err(format!("unknown policy status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    Auto,
    Home,
    Life,
}

impl PolicyType {
    /// Prefix used when generating policy numbers, e.g. `AUTO-2024-005`.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            PolicyType::Auto => "AUTO",
            PolicyType::Home => "HOME",
            PolicyType::Life => "LIFE",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyType::Auto => write!(f, "Auto"),
            PolicyType::Home => write!(f, "Home"),
            PolicyType::Life => write!(f, "Life"),
        }
    }
}

impl FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PolicyType::Auto),
            "home" => Ok(PolicyType::Home),
            "life" => Ok(PolicyType::Life),
            other => Err(format!("unknown policy type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub policy_number: String,
    pub policy_type: PolicyType,
    pub premium: f64,
    pub coverage: f64,
    pub status: PolicyStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Refreshed whenever a payment against this policy is recorded.
    pub next_due_date: Option<NaiveDate>,
    pub description: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Pending,
    #[serde(rename = "Under Review")]
    UnderReview,
    Approved,
    Rejected,
}

impl ClaimStatus {
    /// Pending and under-review claims both count as open on the dashboard.
    pub fn is_open(&self) -> bool {
        matches!(self, ClaimStatus::Pending | ClaimStatus::UnderReview)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "Pending"),
            ClaimStatus::UnderReview => write!(f, "Under Review"),
            ClaimStatus::Approved => write!(f, "Approved"),
            ClaimStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ClaimStatus::Pending),
            "under review" | "under_review" => Ok(ClaimStatus::UnderReview),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(format!("unknown claim status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub claim_number: String,
    pub amount: f64,
    pub status: ClaimStatus,
    pub description: String,
    pub incident_date: NaiveDate,
    pub filed_date: NaiveDate,
    pub policy_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub policy_id: String,
    pub amount: f64,
    pub method: String,
    pub paid_on: NaiveDate,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub kind: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

// --- Case wizard details ---------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bike,
    Commercial,
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleType::Car => write!(f, "car"),
            VehicleType::Bike => write!(f, "bike"),
            VehicleType::Commercial => write!(f, "commercial"),
        }
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(VehicleType::Car),
            "bike" => Ok(VehicleType::Bike),
            "commercial" => Ok(VehicleType::Commercial),
            other => Err(format!("unknown vehicle type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Cng,
    Electric,
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelType::Petrol => write!(f, "petrol"),
            FuelType::Diesel => write!(f, "diesel"),
            FuelType::Cng => write!(f, "cng"),
            FuelType::Electric => write!(f, "electric"),
        }
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "petrol" => Ok(FuelType::Petrol),
            "diesel" => Ok(FuelType::Diesel),
            "cng" => Ok(FuelType::Cng),
            "electric" => Ok(FuelType::Electric),
            other => Err(format!("unknown fuel type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Commercial,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Apartment => write!(f, "apartment"),
            PropertyType::House => write!(f, "house"),
            PropertyType::Commercial => write!(f, "commercial"),
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apartment" => Ok(PropertyType::Apartment),
            "house" => Ok(PropertyType::House),
            "commercial" => Ok(PropertyType::Commercial),
            other => Err(format!("unknown property type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub make: String,
    pub model: String,
    pub year: u32,
    pub vehicle_type: VehicleType,
    pub fuel_type: FuelType,
    pub registration: String,
    /// Insured declared value: depreciation-adjusted vehicle valuation used
    /// as the base amount for premium rating.
    pub idv: f64,
    pub driver_age: u32,
    pub ncb_tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub address: String,
    pub property_type: PropertyType,
    pub year_built: u32,
    pub sum_insured: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSelection {
    pub deductible: u32,
    #[serde(default)]
    pub addons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Issued,
}

/// CRM-style record unifying customer, product details, quote and status for
/// one completed wizard run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub reference: String,
    pub status: CaseStatus,
    pub customer: CustomerDetails,
    pub vehicle: Option<VehicleDetails>,
    pub property: Option<PropertyDetails>,
    pub coverage: CoverageSelection,
    pub quote: crate::rating::QuoteBreakdown,
    #[serde(default)]
    pub documents: Vec<String>,
    pub agent_id: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl CaseRecord {
    pub fn policy_type(&self) -> PolicyType {
        if self.vehicle.is_some() {
            PolicyType::Auto
        } else {
            PolicyType::Home
        }
    }

    pub fn covered_amount(&self) -> f64 {
        self.quote.base_amount
    }
}
