mod bracket_schedule;
mod tax_bracket;

pub use bracket_schedule::{BracketBand, BracketSchedule, ScheduleError};
pub use tax_bracket::TaxBracket;
