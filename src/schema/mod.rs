pub mod goal;
pub mod league;
pub mod phrase;
pub mod record;
