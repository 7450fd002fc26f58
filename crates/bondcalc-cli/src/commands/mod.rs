pub mod bond;
pub mod cash_flows;
