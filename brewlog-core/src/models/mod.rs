mod brew_entry;
mod brew_method;

pub use brew_entry::{
    format_brew_time, BrewEntry, BrewFields, BrewFilter, MAX_RATING, MAX_WATER_TEMP,
    MIN_BREW_TIME, MIN_RATING, MIN_WATER_TEMP,
};
pub use brew_method::{is_brew_method, BrewMethod};
