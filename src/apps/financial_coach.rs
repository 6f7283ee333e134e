//! Financial coach: budget review, savings strategy and a debt payoff plan.

use std::sync::Arc;

use crate::agents::{FnAgent, LlmAgent};
use crate::apps::debt::{self, Debt};
use crate::criteria::{Criteria, FinancialProfile};
use crate::errors::{CriteriaError, PipelineResult};
use crate::generate::ChatModel;
use crate::models::pipeline::{Pipeline, PipelineRun};
use crate::progress::ProgressReporter;
use crate::render::Report;

pub const BUDGET_ANALYSIS: &str = "budget_analysis";
pub const SAVINGS_STRATEGY: &str = "savings_strategy";
pub const DEBT_PLAN: &str = "debt_plan";
pub const DEBT_REDUCTION: &str = "debt_reduction";

const BUDGET_INSTRUCTIONS: &str = "You are a budget analysis expert. Break spending down by \
    category, point out where the money goes and name the three largest savings opportunities.";

const SAVINGS_INSTRUCTIONS: &str = "You are a savings strategist. Recommend an emergency fund \
    target, an automated savings split and concrete monthly amounts.";

const DEBT_INSTRUCTIONS: &str = "You are a debt reduction coach. Explain the computed payoff \
    plans in plain language, recommend one strategy and list motivating milestones. Use the \
    numbers you are given; do not recompute them.";

const BUDGET_PROMPT: &str = "Monthly income: ${criteria.monthly_income}\n\
    Dependants: {criteria.dependants}\n\
    Expenses ({criteria.total_expenses} total):\n{criteria.expenses}\n\n\
    Analyse this budget.";

const SAVINGS_PROMPT: &str = "Monthly income: ${criteria.monthly_income}, \
    expenses: ${criteria.total_expenses}, dependants: {criteria.dependants}.\n\n\
    Budget analysis:\n{stage.budget_analysis}\n\nPropose a savings strategy.";

const DEBT_PROMPT: &str = "Debts: {criteria.debts}\n\
    Extra payment available: ${criteria.extra_debt_payment}/month\n\n\
    Computed payoff plans:\n{stage.debt_plan}\n\n\
    Savings strategy:\n{stage.savings_strategy}\n\nBuild the debt reduction plan.";

/// Four-stage coaching pipeline over one household's finances.
pub struct FinancialCoach {
    model: Arc<dyn ChatModel>,
}

impl FinancialCoach {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn pipeline(&self, profile: &FinancialProfile) -> PipelineResult<Pipeline> {
        let budget = LlmAgent::new(BUDGET_ANALYSIS, self.model.clone())
            .with_instructions(BUDGET_INSTRUCTIONS)
            .with_prompt(BUDGET_PROMPT);

        let savings = LlmAgent::new(SAVINGS_STRATEGY, self.model.clone())
            .with_instructions(SAVINGS_INSTRUCTIONS)
            .with_prompt(SAVINGS_PROMPT);

        let debts = profile.debts.clone();
        let extra = profile.extra_debt_payment;
        let plan = FnAgent::new(DEBT_PLAN, move |_ctx| Ok(debt::summarize(&debts, extra)?));

        let reduction = LlmAgent::new(DEBT_REDUCTION, self.model.clone())
            .with_instructions(DEBT_INSTRUCTIONS)
            .with_prompt(DEBT_PROMPT);

        Pipeline::new("financial_coach")
            .with_stage(Box::new(budget))?
            .with_stage(Box::new(savings))?
            .with_stage(Box::new(plan))?
            .with_stage(Box::new(reduction))
    }

    pub async fn run(
        &self,
        profile: &FinancialProfile,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<PipelineRun> {
        let criteria = Criteria::from(profile);
        validate(&criteria)?;
        self.pipeline(profile)?.run(criteria, progress).await
    }
}

/// Income must be present and positive.
pub fn validate(criteria: &Criteria) -> Result<(), CriteriaError> {
    criteria.require(&["monthly_income"])?;
    let income = criteria.number_or("monthly_income", 0.0);
    if income <= 0.0 || !income.is_finite() {
        return Err(CriteriaError::Invalid {
            field: "monthly_income".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Report with the headline numbers on top.
pub fn report(run: &PipelineRun, profile: &FinancialProfile) -> Report {
    let expenses: f64 = profile.expenses.iter().map(|(_, amount)| amount).sum();
    let savings = profile.monthly_income - expenses;

    let mut report = Report::from_run("Financial plan", run)
        .metric("Monthly income", format!("${:.2}", profile.monthly_income))
        .metric("Monthly expenses", format!("${:.2}", expenses))
        .metric("Savings potential", format!("${:.2}", savings));

    if let Some(months) = debt_free_months(&profile.debts, profile.extra_debt_payment) {
        report = report.metric("Debt-free in", format!("{} months", months));
    }
    report
}

/// Months to clear every debt with the avalanche strategy, when it ever happens.
fn debt_free_months(debts: &[Debt], extra: f64) -> Option<u32> {
    if debts.is_empty() {
        return None;
    }
    debt::payoff_plan(debts, extra, debt::Strategy::Avalanche)
        .ok()
        .map(|plan| plan.months)
}
