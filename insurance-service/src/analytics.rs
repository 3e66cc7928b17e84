//! Chart-feeding aggregates. Rendering is the client's problem; this module
//! only shapes the data: premium and coverage grouped by policy type, the
//! policy distribution, and the claims timeline.

use serde::Serialize;

use crate::domain::{Claim, ClaimStatus, Policy, PolicyStatus, PolicyType};

#[derive(Debug, Clone, Serialize)]
pub struct TypeAmount {
    pub policy_type: PolicyType,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub policy_type: PolicyType,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelinePoint {
    pub date: chrono::NaiveDate,
    pub amount: f64,
    pub status: ClaimStatus,
    pub claim_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub premium_by_type: Vec<TypeAmount>,
    pub coverage_by_type: Vec<TypeAmount>,
    pub policy_distribution: Vec<TypeCount>,
    pub claims_timeline: Vec<TimelinePoint>,
}

pub fn report(policies: &[Policy], claims: &[Claim]) -> AnalyticsReport {
    let active: Vec<&Policy> = policies
        .iter()
        .filter(|p| p.status == PolicyStatus::Active)
        .collect();

    let mut timeline: Vec<TimelinePoint> = claims
        .iter()
        .map(|c| TimelinePoint {
            date: c.filed_date,
            amount: c.amount,
            status: c.status,
            claim_number: c.claim_number.clone(),
        })
        .collect();
    timeline.sort_by_key(|p| p.date);

    AnalyticsReport {
        premium_by_type: sum_by_type(&active, |p| p.premium),
        coverage_by_type: sum_by_type(&active, |p| p.coverage),
        policy_distribution: distribution(policies),
        claims_timeline: timeline,
    }
}

/// Groups in order of first appearance so repeated calls over the same data
/// produce the same ordering.
fn sum_by_type(policies: &[&Policy], amount: impl Fn(&Policy) -> f64) -> Vec<TypeAmount> {
    let mut groups: Vec<TypeAmount> = Vec::new();
    for policy in policies {
        match groups
            .iter_mut()
            .find(|g| g.policy_type == policy.policy_type)
        {
            Some(group) => group.amount += amount(policy),
            None => groups.push(TypeAmount {
                policy_type: policy.policy_type,
                amount: amount(policy),
            }),
        }
    }
    groups
}

fn distribution(policies: &[Policy]) -> Vec<TypeCount> {
    let mut groups: Vec<TypeCount> = Vec::new();
    for policy in policies {
        match groups
            .iter_mut()
            .find(|g| g.policy_type == policy.policy_type)
        {
            Some(group) => group.count += 1,
            None => groups.push(TypeCount {
                policy_type: policy.policy_type,
                count: 1,
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn policy(id: &str, policy_type: PolicyType, premium: f64, coverage: f64) -> Policy {
        Policy {
            id: id.to_string(),
            policy_number: format!("{}-2024-{id}", policy_type.number_prefix()),
            policy_type,
            premium,
            coverage,
            status: PolicyStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            next_due_date: None,
            description: String::new(),
            user_id: "1".to_string(),
        }
    }

    fn claim(number: &str, day: u32, amount: f64) -> Claim {
        Claim {
            id: number.to_string(),
            claim_number: number.to_string(),
            amount,
            status: ClaimStatus::Pending,
            description: String::new(),
            incident_date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
            filed_date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
            policy_id: "1".to_string(),
            user_id: "1".to_string(),
        }
    }

    #[test]
    fn premiums_group_by_type_in_first_appearance_order() {
        let policies = vec![
            policy("1", PolicyType::Auto, 1200.0, 50_000.0),
            policy("2", PolicyType::Home, 800.0, 250_000.0),
            policy("3", PolicyType::Auto, 1100.0, 45_000.0),
        ];
        let report = report(&policies, &[]);

        assert_eq!(report.premium_by_type.len(), 2);
        assert_eq!(report.premium_by_type[0].policy_type, PolicyType::Auto);
        assert_eq!(report.premium_by_type[0].amount, 2300.0);
        assert_eq!(report.premium_by_type[1].amount, 800.0);
        assert_eq!(report.coverage_by_type[0].amount, 95_000.0);
        assert_eq!(report.policy_distribution[0].count, 2);
    }

    #[test]
    fn expired_policies_are_excluded_from_sums_but_counted() {
        let mut expired = policy("1", PolicyType::Auto, 1200.0, 50_000.0);
        expired.status = PolicyStatus::Expired;
        let policies = vec![expired, policy("2", PolicyType::Auto, 1100.0, 45_000.0)];
        let report = report(&policies, &[]);

        assert_eq!(report.premium_by_type[0].amount, 1100.0);
        assert_eq!(report.policy_distribution[0].count, 2);
    }

    #[test]
    fn claims_timeline_is_ordered_by_filed_date() {
        let claims = vec![
            claim("CLM-2024-002", 20, 1200.0),
            claim("CLM-2024-001", 5, 5000.0),
        ];
        let report = report(&[], &claims);

        let numbers: Vec<&str> = report
            .claims_timeline
            .iter()
            .map(|p| p.claim_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["CLM-2024-001", "CLM-2024-002"]);
    }
}
