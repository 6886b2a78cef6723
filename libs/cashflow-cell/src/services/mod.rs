pub mod cashflow;

pub use cashflow::CashFlowService;
