pub mod evolution;
pub mod history;

pub use evolution::EvolutionService;
pub use history::HistoryService;
