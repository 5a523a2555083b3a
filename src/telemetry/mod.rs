pub mod correction_history;
