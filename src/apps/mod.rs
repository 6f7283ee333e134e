//! Ready-made pipelines built on the generic stages.

pub mod debt;
pub mod financial_coach;
pub mod real_estate;

pub use financial_coach::FinancialCoach;
pub use real_estate::RealEstateTeam;
