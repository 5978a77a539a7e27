//! surveyprep: canonical feature tables from coded health-survey records
//!
//! Raw BRFSS-style answers (composite codes, don't-know/refused sentinels,
//! reversed yes/no fields) are normalized through a declarative rule table,
//! categorical labels are encoded, and every record is aligned to a feature
//! schema frozen at fit time so that training and inference see the same
//! columns in the same order.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
