pub mod delivery;
pub mod student;
