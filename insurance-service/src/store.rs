//! Per-login in-memory state. Every login seeds a fresh [`Tenant`] from the
//! sample generators below; nothing is persisted and nothing is shared
//! between tokens. Records are append-only, with one exception: recording a
//! payment rebuilds the paid policy to refresh its next due date.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::analytics::{self, AnalyticsReport};
use crate::domain::{
    Activity, Agent, CaseRecord, Claim, ClaimStatus, Payment, Policy, PolicyStatus, PolicyType,
    User,
};

#[derive(Debug, Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationError(pub Vec<String>);

#[derive(Debug, Clone, Deserialize)]
pub struct NewClaim {
    pub policy_id: String,
    pub amount: f64,
    pub incident_date: Option<NaiveDate>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub policy_id: String,
    pub amount: f64,
    pub method: String,
}

/// Claim joined with a human-readable policy label. A dangling policy id
/// yields "Unknown Policy" rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimView {
    #[serde(flatten)]
    pub claim: Claim,
    pub policy_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub active_policies: usize,
    pub annual_premium: f64,
    pub total_coverage: f64,
    pub open_claims: usize,
    pub approved_claims: usize,
    pub recent_activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFilter {
    pub status: Option<String>,
    pub policy_type: Option<String>,
}

struct TenantState {
    policies: Vec<Policy>,
    claims: Vec<Claim>,
    payments: Vec<Payment>,
    agents: Vec<Agent>,
    activities: Vec<Activity>,
    cases: Vec<CaseRecord>,
    claim_seq: u32,
    policy_seq: u32,
}

/// One login session's worth of data, seeded fresh on creation.
pub struct Tenant {
    user: User,
    state: Mutex<TenantState>,
}

impl Tenant {
    pub fn seeded() -> Self {
        let user = sample_users()[0].clone();
        let state = TenantState {
            policies: sample_policies(),
            claims: sample_claims(),
            payments: sample_payments(),
            agents: sample_agents(),
            activities: sample_activities(),
            cases: Vec::new(),
            claim_seq: 3,
            policy_seq: 4,
        };
        Self {
            user,
            state: Mutex::new(state),
        }
    }

    pub fn current_user(&self) -> User {
        self.user.clone()
    }

    pub fn policies(&self, filter: &PolicyFilter) -> Vec<Policy> {
        let state = self.state.lock().unwrap();
        state
            .policies
            .iter()
            .filter(|p| p.user_id == self.user.id)
            .filter(|p| match &filter.status {
                Some(status) => p.status.to_string().eq_ignore_ascii_case(status),
                None => true,
            })
            .filter(|p| match &filter.policy_type {
                Some(kind) => p.policy_type.to_string().eq_ignore_ascii_case(kind),
                None => true,
            })
            .cloned()
            .collect()
    }

    pub fn policy(&self, id: &str) -> Option<Policy> {
        let state = self.state.lock().unwrap();
        state
            .policies
            .iter()
            .find(|p| p.id == id && p.user_id == self.user.id)
            .cloned()
    }

    pub fn claims(&self, status: Option<ClaimStatus>) -> Vec<ClaimView> {
        let state = self.state.lock().unwrap();
        state
            .claims
            .iter()
            .filter(|c| c.user_id == self.user.id)
            .filter(|c| status.map_or(true, |s| c.status == s))
            .map(|c| ClaimView {
                policy_label: policy_label(&state.policies, &c.policy_id),
                claim: c.clone(),
            })
            .collect()
    }

    /// Append exactly one claim, or append nothing and report every missing
    /// field.
    pub fn submit_claim(&self, new_claim: NewClaim) -> Result<Claim, ValidationError> {
        let mut problems = Vec::new();
        if new_claim.policy_id.trim().is_empty() {
            problems.push("policy_id is required".to_string());
        }
        if new_claim.amount <= 0.0 {
            problems.push("amount must be greater than zero".to_string());
        }
        if new_claim.incident_date.is_none() {
            problems.push("incident_date is required".to_string());
        }
        if new_claim.description.trim().is_empty() {
            problems.push("description is required".to_string());
        }
        if !problems.is_empty() {
            return Err(ValidationError(problems));
        }

        let mut state = self.state.lock().unwrap();
        let today = Utc::now().date_naive();
        state.claim_seq += 1;
        let claim = Claim {
            id: Uuid::new_v4().to_string(),
            claim_number: format!("CLM-{}-{:03}", today.year(), state.claim_seq),
            amount: new_claim.amount,
            status: ClaimStatus::Pending,
            description: new_claim.description.trim().to_string(),
            incident_date: new_claim.incident_date.expect("checked above"),
            filed_date: today,
            policy_id: new_claim.policy_id,
            user_id: self.user.id.clone(),
        };
        state.claims.push(claim.clone());
        let description = format!("Claim {} submitted", claim.claim_number);
        log_activity(&mut state, &self.user.id, "CLAIM_SUBMITTED", description);
        Ok(claim)
    }

    pub fn payments(&self) -> Vec<Payment> {
        let state = self.state.lock().unwrap();
        state
            .payments
            .iter()
            .filter(|p| p.user_id == self.user.id)
            .cloned()
            .collect()
    }

    /// Append a payment and rebuild the paid policy with a due date one month
    /// out. This is the only mutation of an existing record in the system.
    pub fn record_payment(&self, new_payment: NewPayment) -> Result<Payment, ValidationError> {
        let mut problems = Vec::new();
        if new_payment.policy_id.trim().is_empty() {
            problems.push("policy_id is required".to_string());
        }
        if new_payment.amount <= 0.0 {
            problems.push("amount must be greater than zero".to_string());
        }
        if new_payment.method.trim().is_empty() {
            problems.push("method is required".to_string());
        }
        if !problems.is_empty() {
            return Err(ValidationError(problems));
        }

        let mut state = self.state.lock().unwrap();
        let today = Utc::now().date_naive();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            policy_id: new_payment.policy_id.clone(),
            amount: new_payment.amount,
            method: new_payment.method.trim().to_string(),
            paid_on: today,
            user_id: self.user.id.clone(),
        };
        state.payments.push(payment.clone());

        if let Some(index) = state
            .policies
            .iter()
            .position(|p| p.id == new_payment.policy_id)
        {
            let refreshed = Policy {
                next_due_date: today.checked_add_months(Months::new(1)),
                ..state.policies[index].clone()
            };
            state.policies[index] = refreshed;
        }

        let description = format!(
            "Payment of ${:.2} recorded for policy {}",
            payment.amount,
            policy_label(&state.policies, &payment.policy_id)
        );
        log_activity(&mut state, &self.user.id, "PAYMENT_RECORDED", description);
        Ok(payment)
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.state.lock().unwrap().agents.clone()
    }

    pub fn activities(&self) -> Vec<Activity> {
        let state = self.state.lock().unwrap();
        state
            .activities
            .iter()
            .filter(|a| a.user_id == self.user.id)
            .cloned()
            .collect()
    }

    pub fn dashboard(&self) -> DashboardSummary {
        let state = self.state.lock().unwrap();
        let active: Vec<&Policy> = state
            .policies
            .iter()
            .filter(|p| p.user_id == self.user.id && p.status == PolicyStatus::Active)
            .collect();
        let claims: Vec<&Claim> = state
            .claims
            .iter()
            .filter(|c| c.user_id == self.user.id)
            .collect();

        let mut recent: Vec<Activity> = state
            .activities
            .iter()
            .filter(|a| a.user_id == self.user.id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(5);

        DashboardSummary {
            active_policies: active.len(),
            annual_premium: active.iter().map(|p| p.premium).sum(),
            total_coverage: active.iter().map(|p| p.coverage).sum(),
            open_claims: claims.iter().filter(|c| c.status.is_open()).count(),
            approved_claims: claims
                .iter()
                .filter(|c| c.status == ClaimStatus::Approved)
                .count(),
            recent_activities: recent,
        }
    }

    pub fn analytics(&self) -> AnalyticsReport {
        let state = self.state.lock().unwrap();
        let policies: Vec<Policy> = state
            .policies
            .iter()
            .filter(|p| p.user_id == self.user.id)
            .cloned()
            .collect();
        let claims: Vec<Claim> = state
            .claims
            .iter()
            .filter(|c| c.user_id == self.user.id)
            .cloned()
            .collect();
        analytics::report(&policies, &claims)
    }

    pub fn cases(&self) -> Vec<CaseRecord> {
        self.state.lock().unwrap().cases.clone()
    }

    /// Record an issued case: assigns an agent round-robin, appends the case,
    /// derives a policy record from the quote, and logs the activity.
    pub fn add_case(&self, mut case: CaseRecord) -> CaseRecord {
        let mut state = self.state.lock().unwrap();
        if !state.agents.is_empty() {
            let index = state.cases.len() % state.agents.len();
            case.agent_id = Some(state.agents[index].id.clone());
        }

        let today = Utc::now().date_naive();
        let policy_type = case.policy_type();
        state.policy_seq += 1;
        let policy = Policy {
            id: Uuid::new_v4().to_string(),
            policy_number: format!(
                "{}-{}-{:03}",
                policy_type.number_prefix(),
                today.year(),
                state.policy_seq
            ),
            policy_type,
            premium: case.quote.premium,
            coverage: case.covered_amount(),
            status: PolicyStatus::Active,
            start_date: today,
            end_date: today
                .checked_add_months(Months::new(12))
                .unwrap_or(today),
            next_due_date: today.checked_add_months(Months::new(1)),
            description: format!("Issued from case {}", case.reference),
            user_id: self.user.id.clone(),
        };
        let description = format!(
            "Case {} issued as policy {}",
            case.reference, policy.policy_number
        );
        state.policies.push(policy);
        state.cases.push(case.clone());
        log_activity(&mut state, &self.user.id, "CASE_ISSUED", description);
        case
    }
}

fn policy_label(policies: &[Policy], policy_id: &str) -> String {
    policies
        .iter()
        .find(|p| p.id == policy_id)
        .map(|p| format!("{} - {}", p.policy_type, p.policy_number))
        .unwrap_or_else(|| "Unknown Policy".to_string())
}

fn log_activity(state: &mut TenantState, user_id: &str, kind: &str, description: String) {
    state.activities.push(Activity {
        id: Uuid::new_v4().to_string(),
        kind: kind.to_string(),
        description,
        timestamp: Utc::now(),
        user_id: user_id.to_string(),
    });
}

// --- Sample data -----------------------------------------------------------

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("sample date is valid")
}

fn timestamp(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("sample timestamp is valid")
}

fn sample_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            phone: "+1-555-0123".to_string(),
            address: "123 Main St, Anytown, USA".to_string(),
        },
        User {
            id: "2".to_string(),
            name: "Jane Smith".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+1-555-0124".to_string(),
            address: "456 Oak Ave, Anytown, USA".to_string(),
        },
    ]
}

fn sample_policies() -> Vec<Policy> {
    vec![
        Policy {
            id: "1".to_string(),
            policy_number: "AUTO-2024-001".to_string(),
            policy_type: PolicyType::Auto,
            premium: 1200.0,
            coverage: 50_000.0,
            status: PolicyStatus::Active,
            start_date: date(2024, 1, 15),
            end_date: date(2025, 1, 15),
            next_due_date: None,
            description: "Comprehensive Auto Insurance".to_string(),
            user_id: "1".to_string(),
        },
        Policy {
            id: "2".to_string(),
            policy_number: "HOME-2024-001".to_string(),
            policy_type: PolicyType::Home,
            premium: 800.0,
            coverage: 250_000.0,
            status: PolicyStatus::Active,
            start_date: date(2024, 3, 1),
            end_date: date(2025, 3, 1),
            next_due_date: None,
            description: "Homeowners Insurance".to_string(),
            user_id: "1".to_string(),
        },
        Policy {
            id: "3".to_string(),
            policy_number: "LIFE-2024-001".to_string(),
            policy_type: PolicyType::Life,
            premium: 2400.0,
            coverage: 500_000.0,
            status: PolicyStatus::Active,
            start_date: date(2024, 2, 10),
            end_date: date(2025, 2, 10),
            next_due_date: None,
            description: "Term Life Insurance".to_string(),
            user_id: "1".to_string(),
        },
        Policy {
            id: "4".to_string(),
            policy_number: "AUTO-2024-002".to_string(),
            policy_type: PolicyType::Auto,
            premium: 1100.0,
            coverage: 45_000.0,
            status: PolicyStatus::Active,
            start_date: date(2024, 4, 1),
            end_date: date(2025, 4, 1),
            next_due_date: None,
            description: "Standard Auto Insurance".to_string(),
            user_id: "2".to_string(),
        },
    ]
}

fn sample_claims() -> Vec<Claim> {
    vec![
        Claim {
            id: "1".to_string(),
            claim_number: "CLM-2024-001".to_string(),
            amount: 5000.0,
            status: ClaimStatus::Approved,
            description: "Car accident repair - rear-end collision".to_string(),
            incident_date: date(2024, 8, 10),
            filed_date: date(2024, 8, 15),
            policy_id: "1".to_string(),
            user_id: "1".to_string(),
        },
        Claim {
            id: "2".to_string(),
            claim_number: "CLM-2024-002".to_string(),
            amount: 1200.0,
            status: ClaimStatus::Pending,
            description: "Water damage to basement from pipe burst".to_string(),
            incident_date: date(2024, 8, 30),
            filed_date: date(2024, 9, 1),
            policy_id: "2".to_string(),
            user_id: "1".to_string(),
        },
        Claim {
            id: "3".to_string(),
            claim_number: "CLM-2024-003".to_string(),
            amount: 800.0,
            status: ClaimStatus::UnderReview,
            description: "Windshield replacement".to_string(),
            incident_date: date(2024, 9, 10),
            filed_date: date(2024, 9, 12),
            policy_id: "4".to_string(),
            user_id: "2".to_string(),
        },
    ]
}

fn sample_payments() -> Vec<Payment> {
    vec![
        Payment {
            id: "1".to_string(),
            policy_id: "1".to_string(),
            amount: 100.0,
            method: "card".to_string(),
            paid_on: date(2024, 7, 15),
            user_id: "1".to_string(),
        },
        Payment {
            id: "2".to_string(),
            policy_id: "3".to_string(),
            amount: 200.0,
            method: "bank transfer".to_string(),
            paid_on: date(2024, 8, 10),
            user_id: "1".to_string(),
        },
    ]
}

fn sample_agents() -> Vec<Agent> {
    vec![
        Agent {
            id: "1".to_string(),
            name: "Alice Carter".to_string(),
            email: "alice.carter@insurance.com".to_string(),
            phone: "+1-555-0200".to_string(),
            region: "North".to_string(),
        },
        Agent {
            id: "2".to_string(),
            name: "Bob Reyes".to_string(),
            email: "bob.reyes@insurance.com".to_string(),
            phone: "+1-555-0201".to_string(),
            region: "South".to_string(),
        },
    ]
}

fn sample_activities() -> Vec<Activity> {
    vec![
        Activity {
            id: "1".to_string(),
            kind: "POLICY_CREATED".to_string(),
            description: "New Auto insurance policy created".to_string(),
            timestamp: timestamp(2024, 1, 15, 10, 0),
            user_id: "1".to_string(),
        },
        Activity {
            id: "2".to_string(),
            kind: "CLAIM_SUBMITTED".to_string(),
            description: "Claim submitted for car accident".to_string(),
            timestamp: timestamp(2024, 8, 15, 14, 30),
            user_id: "1".to_string(),
        },
        Activity {
            id: "3".to_string(),
            kind: "CLAIM_APPROVED".to_string(),
            description: "Claim CLM-2024-001 approved and processed".to_string(),
            timestamp: timestamp(2024, 8, 20, 9, 15),
            user_id: "1".to_string(),
        },
        Activity {
            id: "4".to_string(),
            kind: "POLICY_CREATED".to_string(),
            description: "New Home insurance policy created".to_string(),
            timestamp: timestamp(2024, 3, 1, 11, 0),
            user_id: "1".to_string(),
        },
        Activity {
            id: "5".to_string(),
            kind: "CLAIM_SUBMITTED".to_string(),
            description: "Claim submitted for water damage".to_string(),
            timestamp: timestamp(2024, 9, 1, 16, 0),
            user_id: "1".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_claim() -> NewClaim {
        NewClaim {
            policy_id: "1".to_string(),
            amount: 1500.0,
            incident_date: Some(date(2024, 9, 20)),
            description: "Hail damage to hood and roof".to_string(),
        }
    }

    #[test]
    fn valid_claim_appends_exactly_one_record() {
        let tenant = Tenant::seeded();
        let before = tenant.claims(None).len();

        let claim = tenant.submit_claim(valid_claim()).unwrap();
        assert_eq!(claim.claim_number, format!("CLM-{}-004", Utc::now().year()));
        assert_eq!(claim.amount, 1500.0);
        assert_eq!(claim.status, ClaimStatus::Pending);

        let after = tenant.claims(None);
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last().unwrap().claim.id, claim.id);
    }

    #[test]
    fn invalid_claim_appends_nothing() {
        let tenant = Tenant::seeded();
        let before = tenant.claims(None).len();

        let err = tenant
            .submit_claim(NewClaim {
                policy_id: "  ".to_string(),
                amount: 0.0,
                incident_date: None,
                description: String::new(),
            })
            .unwrap_err();

        assert_eq!(err.0.len(), 4);
        assert_eq!(tenant.claims(None).len(), before);
    }

    #[test]
    fn claim_numbers_are_fresh_per_submission() {
        let tenant = Tenant::seeded();
        let first = tenant.submit_claim(valid_claim()).unwrap();
        let second = tenant.submit_claim(valid_claim()).unwrap();
        assert_ne!(first.claim_number, second.claim_number);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn status_filter_preserves_relative_order() {
        let tenant = Tenant::seeded();
        tenant.submit_claim(valid_claim()).unwrap();
        tenant.submit_claim(valid_claim()).unwrap();

        let pending = tenant.claims(Some(ClaimStatus::Pending));
        assert!(pending.iter().all(|c| c.claim.status == ClaimStatus::Pending));

        // Seeded pending claim first, then the two new ones in submit order.
        let numbers: Vec<&str> = pending
            .iter()
            .map(|c| c.claim.claim_number.as_str())
            .collect();
        assert_eq!(numbers[0], "CLM-2024-002");
        assert!(numbers[1] < numbers[2]);
    }

    #[test]
    fn claims_join_policies_with_unknown_fallback() {
        let tenant = Tenant::seeded();
        tenant
            .submit_claim(NewClaim {
                policy_id: "does-not-exist".to_string(),
                ..valid_claim()
            })
            .unwrap();

        let claims = tenant.claims(None);
        assert_eq!(claims[0].policy_label, "Auto - AUTO-2024-001");
        assert_eq!(claims.last().unwrap().policy_label, "Unknown Policy");
    }

    #[test]
    fn payment_refreshes_the_policy_due_date() {
        let tenant = Tenant::seeded();
        assert!(tenant.policy("1").unwrap().next_due_date.is_none());

        tenant
            .record_payment(NewPayment {
                policy_id: "1".to_string(),
                amount: 100.0,
                method: "card".to_string(),
            })
            .unwrap();

        let refreshed = tenant.policy("1").unwrap();
        let expected = Utc::now()
            .date_naive()
            .checked_add_months(Months::new(1))
            .unwrap();
        assert_eq!(refreshed.next_due_date, Some(expected));
        // Everything else about the policy is untouched.
        assert_eq!(refreshed.policy_number, "AUTO-2024-001");
        assert_eq!(refreshed.premium, 1200.0);
    }

    #[test]
    fn dashboard_metrics_match_the_seed() {
        let tenant = Tenant::seeded();
        let summary = tenant.dashboard();
        assert_eq!(summary.active_policies, 3);
        assert_eq!(summary.annual_premium, 4400.0);
        assert_eq!(summary.total_coverage, 800_000.0);
        assert_eq!(summary.open_claims, 1);
        assert_eq!(summary.approved_claims, 1);
        assert_eq!(summary.recent_activities.len(), 5);
        // Sorted most recent first.
        let ts: Vec<_> = summary
            .recent_activities
            .iter()
            .map(|a| a.timestamp)
            .collect();
        assert!(ts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn policy_filters_are_scoped_to_the_current_user() {
        let tenant = Tenant::seeded();
        let all = tenant.policies(&PolicyFilter::default());
        assert_eq!(all.len(), 3);

        let autos = tenant.policies(&PolicyFilter {
            policy_type: Some("auto".to_string()),
            status: None,
        });
        assert_eq!(autos.len(), 1);
        assert_eq!(autos[0].policy_number, "AUTO-2024-001");
    }

    #[test]
    fn policy_lookup_is_scoped_to_the_current_user() {
        let tenant = Tenant::seeded();
        assert!(tenant.policy("1").is_some());
        // Policy 4 belongs to the other seeded user and must stay hidden.
        assert!(tenant.policy("4").is_none());
    }

    #[test]
    fn issuing_a_case_appends_case_policy_and_activity() {
        use crate::domain::{
            CaseRecord, CaseStatus, CoverageSelection, CustomerDetails, FuelType, VehicleDetails,
            VehicleType,
        };
        use crate::rating;

        let tenant = Tenant::seeded();
        let vehicle = VehicleDetails {
            make: "Honda".to_string(),
            model: "City".to_string(),
            year: 2021,
            vehicle_type: VehicleType::Car,
            fuel_type: FuelType::Petrol,
            registration: "KA-01-AB-1234".to_string(),
            idv: 500_000.0,
            driver_age: 30,
            ncb_tier: 20,
        };
        let quote = rating::vehicle_quote(&vehicle, 5000).unwrap();
        let case = CaseRecord {
            id: Uuid::new_v4().to_string(),
            reference: "CASE-0000ABCD".to_string(),
            status: CaseStatus::Issued,
            customer: CustomerDetails {
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                phone: "+1-555-0123".to_string(),
            },
            vehicle: Some(vehicle),
            property: None,
            coverage: CoverageSelection {
                deductible: 5000,
                addons: vec![],
            },
            quote,
            documents: vec![],
            agent_id: None,
            issued_at: Utc::now(),
        };

        let policies_before = tenant.policies(&PolicyFilter::default()).len();
        let issued = tenant.add_case(case);

        assert_eq!(issued.agent_id.as_deref(), Some("1"));
        assert_eq!(tenant.cases().len(), 1);

        let policies = tenant.policies(&PolicyFilter::default());
        assert_eq!(policies.len(), policies_before + 1);
        let new_policy = policies.last().unwrap();
        assert_eq!(new_policy.premium, 10_800.0);
        assert_eq!(new_policy.coverage, 500_000.0);
        assert!(new_policy.policy_number.starts_with("AUTO-"));

        let activities = tenant.activities();
        assert_eq!(activities.last().unwrap().kind, "CASE_ISSUED");
    }
}
